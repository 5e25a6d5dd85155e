//! Nodes the list transform inserts, parsed from short source snippets into
//! the arena of the tree being rewritten.

use oxc_allocator::{Allocator, Box, Vec as ArenaVec};
use oxc_ast::ast::{Expression, FormalParameter, JSXAttributeItem, JSXAttributeValue, JSXElement};
use oxc_parser::Parser;

use crate::adapter::Adapter;
use crate::context::CaptureSet;
use crate::error::TransformError;
use crate::jsx_source_type;

/// Tag of the synthesized loop wrapper.
pub const LOOP_WRAPPER_TAG: &str = "block";

pub struct Snippets<'a> {
    allocator: &'a Allocator,
}

impl<'a> Snippets<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self { allocator }
    }

    fn parse(&self, code: String) -> Result<Expression<'a>, TransformError> {
        let text = self.allocator.alloc_str(&code);
        let mut expr = Parser::new(self.allocator, text, jsx_source_type())
            .parse_expression()
            .map_err(|errors| TransformError::Snippet {
                message: errors
                    .first()
                    .map(|e| e.message.to_string())
                    .unwrap_or_default(),
                code: code.clone(),
            })?;
        while let Expression::ParenthesizedExpression(paren) = expr {
            expr = paren.unbox().expression;
        }
        Ok(expr)
    }

    fn unexpected(code: String) -> TransformError {
        TransformError::Snippet {
            code,
            message: "unexpected node".to_string(),
        }
    }

    /// Plain identifier parameters, in order.
    pub fn params(
        &self,
        names: &[&str],
    ) -> Result<ArenaVec<'a, FormalParameter<'a>>, TransformError> {
        let code = format!("({}) => {{}}", names.join(", "));
        match self.parse(code.clone())? {
            Expression::ArrowFunctionExpression(arrow) => Ok(arrow.unbox().params.unbox().items),
            _ => Err(Self::unexpected(code)),
        }
    }

    /// `{a: a, b: b}` in set order; `{}` for an empty set.
    pub fn capture_object(&self, captures: &CaptureSet) -> Result<Expression<'a>, TransformError> {
        let properties: Vec<String> = captures
            .iter()
            .map(|name| format!("{name}: {name}"))
            .collect();
        let code = format!("({{{}}})", properties.join(", "));
        match self.parse(code.clone())? {
            expr @ Expression::ObjectExpression(_) => Ok(expr),
            _ => Err(Self::unexpected(code)),
        }
    }

    /// `<block COLLECTION={0} ITEM="item" INDEX="index"></block>`. The
    /// collection value is a placeholder for [`collection_slot`].
    pub fn loop_wrapper(
        &self,
        adapter: &Adapter,
        item: &str,
        index: &str,
    ) -> Result<Box<'a, JSXElement<'a>>, TransformError> {
        let code = format!(
            r#"<{tag} {collection}={{0}} {item_attr}="{item}" {index_attr}="{index}"></{tag}>"#,
            tag = LOOP_WRAPPER_TAG,
            collection = adapter.collection(),
            item_attr = adapter.item(),
            index_attr = adapter.index(),
        );
        match self.parse(code.clone())? {
            Expression::JSXElement(element) => Ok(element),
            _ => Err(Self::unexpected(code)),
        }
    }
}

/// The expression of the wrapper's collection attribute.
pub fn collection_slot<'w, 'a>(
    wrapper: &'w mut JSXElement<'a>,
) -> Option<&'w mut Expression<'a>> {
    match wrapper.opening_element.attributes.first_mut()? {
        JSXAttributeItem::Attribute(attr) => match attr.value.as_mut()? {
            JSXAttributeValue::ExpressionContainer(container) => {
                container.expression.as_expression_mut()
            }
            _ => None,
        },
        JSXAttributeItem::SpreadAttribute(_) => None,
    }
}
