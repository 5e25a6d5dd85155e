//! Capture analysis: which loop-scope names a loop body reads.
//!
//! The host template cannot close over lexical scope, so every loop-scope
//! name the body references has to travel in the object the rewritten
//! callback returns. Component-scope names (state, props, imports) are
//! served by page data and are never captured.

use indexmap::IndexSet;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingIdentifier, BlockStatement, Expression, Function,
    IdentifierReference, JSXAttributeItem, JSXAttributeName, JSXAttributeValue, JSXElement,
    JSXElementName, JSXOpeningElement, VariableDeclarator,
};
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::ScopeFlags;

use crate::adapter::Adapter;
use crate::context::{CaptureSet, MergePolicy};

/// Collects, in first-reference order, the identifiers of a subtree that
/// resolve to one of the `bound` loop-scope names.
///
/// Tag names, attribute keys, non-computed object keys and non-computed
/// member properties are never references.
pub struct CaptureAnalyzer<'b> {
    bound: &'b IndexSet<String>,
    policy: MergePolicy,
    loop_attributes: Option<(&'b str, &'b str)>,
    shadowed: Vec<String>,
    captures: CaptureSet,
}

impl<'b> CaptureAnalyzer<'b> {
    pub fn new(bound: &'b IndexSet<String>) -> Self {
        Self {
            bound,
            policy: MergePolicy::default(),
            loop_attributes: None,
            shadowed: Vec::new(),
            captures: CaptureSet::new(),
        }
    }

    pub fn policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Recognise loop wrappers emitted for `adapter`, so that under
    /// [`MergePolicy::Scoped`] their item/index shadow outer names inside
    /// the wrapper's children.
    pub fn loop_attributes(mut self, adapter: &'b Adapter) -> Self {
        self.loop_attributes = Some((adapter.item(), adapter.index()));
        self
    }

    pub fn analyze_element(mut self, element: &JSXElement<'_>) -> CaptureSet {
        self.visit_jsx_element(element);
        self.captures
    }

    pub fn analyze_expr(mut self, expr: &Expression<'_>) -> CaptureSet {
        self.visit_expression(expr);
        self.captures
    }

    fn scoped(&self) -> bool {
        self.policy == MergePolicy::Scoped
    }

    fn reference(&mut self, name: &str) {
        if !self.bound.contains(name) {
            return;
        }
        if self.scoped() && self.shadowed.iter().any(|s| s == name) {
            return;
        }
        self.captures.insert(name.to_string());
    }

    /// Item/index bound by a loop wrapper over its children.
    fn loop_scope<'e>(&self, opening: &'e JSXOpeningElement<'_>) -> Option<(&'e str, &'e str)> {
        let (item_attr, index_attr) = self.loop_attributes?;
        let item = string_attribute(opening, item_attr)?;
        let index = string_attribute(opening, index_attr)?;
        Some((item, index))
    }
}

impl<'a> Visit<'a> for CaptureAnalyzer<'_> {
    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        self.reference(it.name.as_str());
    }

    /// Names introduced inside the subtree. Flattening records them like
    /// references; scoping hides them from the rest of their scope.
    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        match self.policy {
            MergePolicy::Flatten => self.reference(it.name.as_str()),
            MergePolicy::Scoped => self.shadowed.push(it.name.to_string()),
        }
    }

    fn visit_jsx_element_name(&mut self, _it: &JSXElementName<'a>) {}

    fn visit_jsx_element(&mut self, it: &JSXElement<'a>) {
        self.visit_jsx_opening_element(&it.opening_element);

        let scope = self.shadowed.len();
        if self.scoped() {
            if let Some((item, index)) = self.loop_scope(&it.opening_element) {
                self.shadowed.push(item.to_string());
                self.shadowed.push(index.to_string());
            }
        }
        for child in &it.children {
            self.visit_jsx_child(child);
        }
        self.shadowed.truncate(scope);
    }

    /// The initializer reads before the declared name exists.
    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        if let Some(init) = &it.init {
            self.visit_expression(init);
        }
        self.visit_binding_pattern(&it.id);
    }

    fn visit_function(&mut self, it: &Function<'a>, flags: ScopeFlags) {
        let scope = self.shadowed.len();
        walk::walk_function(self, it, flags);
        self.shadowed.truncate(scope);
    }

    fn visit_arrow_function_expression(&mut self, it: &ArrowFunctionExpression<'a>) {
        let scope = self.shadowed.len();
        walk::walk_arrow_function_expression(self, it);
        self.shadowed.truncate(scope);
    }

    fn visit_block_statement(&mut self, it: &BlockStatement<'a>) {
        let scope = self.shadowed.len();
        walk::walk_block_statement(self, it);
        self.shadowed.truncate(scope);
    }
}

/// Value of a string-valued attribute called `name` (`a:for-item="x"`).
pub fn string_attribute<'e>(opening: &'e JSXOpeningElement<'_>, name: &str) -> Option<&'e str> {
    opening.attributes.iter().find_map(|item| match item {
        JSXAttributeItem::Attribute(attr) if attribute_name_is(&attr.name, name) => {
            match attr.value.as_ref()? {
                JSXAttributeValue::StringLiteral(value) => Some(value.value.as_str()),
                _ => None,
            }
        }
        _ => None,
    })
}

/// `true` if `attr` spells `name`, namespace included.
pub fn attribute_name_is(attr: &JSXAttributeName<'_>, name: &str) -> bool {
    match attr {
        JSXAttributeName::Identifier(ident) => ident.name.as_str() == name,
        JSXAttributeName::NamespacedName(ns) => {
            name.split_once(':') == Some((ns.namespace.name.as_str(), ns.name.name.as_str()))
        }
    }
}

/// Capture set of `element` for the loop-scope names in `bound`, using the
/// default merge policy.
pub fn capture_set(element: &JSXElement<'_>, bound: &IndexSet<String>) -> CaptureSet {
    CaptureAnalyzer::new(bound).analyze_element(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsx_source_type;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;

    fn bound(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn analyze(source: &str, bound_names: &[&str], policy: MergePolicy) -> Vec<String> {
        let allocator = Allocator::default();
        let expr = Parser::new(&allocator, source, jsx_source_type())
            .parse_expression()
            .unwrap();
        let bound = bound(bound_names);
        let adapter = Adapter::ali();
        CaptureAnalyzer::new(&bound)
            .policy(policy)
            .loop_attributes(&adapter)
            .analyze_expr(&expr)
            .into_iter()
            .collect()
    }

    #[test]
    fn test_first_reference_order() {
        let allocator = Allocator::default();
        let expr = Parser::new(
            &allocator,
            "<item data-value={val} data-key={idx} other={val} />",
            jsx_source_type(),
        )
        .parse_expression()
        .unwrap();
        let Expression::JSXElement(element) = &expr else {
            panic!("expected an element");
        };
        let set = capture_set(element, &bound(&["idx", "val"]));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["val", "idx"]);
    }

    #[test]
    fn test_component_scope_names_not_captured() {
        let got = analyze(
            "<View>{item.title}<image source={{ uri: item.picUrl }} resizeMode={resizeMode} /></View>",
            &["item", "idx"],
            MergePolicy::Flatten,
        );
        assert_eq!(got, vec!["item"]);
    }

    #[test]
    fn test_tag_attribute_and_key_positions_excluded() {
        // `item` as a tag name, attribute name, object key and member
        // property is not a reference.
        let got = analyze(
            "<Item item=\"x\" style={{ item: 1 }} title={data.item}></Item>",
            &["item", "Item"],
            MergePolicy::Flatten,
        );
        assert!(got.is_empty());
    }

    #[test]
    fn test_shorthand_and_computed_keys_are_references() {
        let got = analyze(
            "<View data={{ item, [index]: 1 }} />",
            &["item", "index"],
            MergePolicy::Flatten,
        );
        assert_eq!(got, vec!["item", "index"]);
    }

    #[test]
    fn test_callee_and_member_root_are_references() {
        let got = analyze(
            "<View onClick={() => select(item.id)}>{format(index)}</View>",
            &["item", "index", "select"],
            MergePolicy::Flatten,
        );
        assert_eq!(got, vec!["select", "item", "index"]);
    }

    #[test]
    fn test_spread_and_optional_chain_are_references() {
        let got = analyze(
            "<View><Item {...row} />{row?.name}{cell?.[index]}</View>",
            &["row", "cell", "index"],
            MergePolicy::Flatten,
        );
        assert_eq!(got, vec!["row", "cell", "index"]);
    }

    #[test]
    fn test_flatten_records_nested_callback_params() {
        let source = "<View><block a:for={l1.map((l2, index) => { return {l2: l2}; })} \
                      a:for-item=\"l2\" a:for-index=\"index\"><View>{l2}</View></block></View>";
        let got = analyze(source, &["l1", "index", "l2"], MergePolicy::Flatten);
        assert_eq!(got, vec!["l1", "l2", "index"]);
    }

    #[test]
    fn test_scoped_honours_wrapper_and_param_shadowing() {
        let source = "<View><block a:for={l1.map((l2, index) => { return {l2: l2}; })} \
                      a:for-item=\"l2\" a:for-index=\"index\"><View>{l2}{index}</View></block></View>";
        let got = analyze(source, &["l1", "index"], MergePolicy::Scoped);
        assert_eq!(got, vec!["l1"]);
    }

    #[test]
    fn test_scoped_local_variable_shadows() {
        let got = analyze(
            "<View onClick={() => { const item = pick(); use(item); }}>{item}</View>",
            &["item"],
            MergePolicy::Scoped,
        );
        // The handler's `item` is local; the child reference is not.
        assert_eq!(got, vec!["item"]);

        let got = analyze(
            "<View onClick={() => { const item = pick(); use(item); }} />",
            &["item"],
            MergePolicy::Scoped,
        );
        assert!(got.is_empty());
    }

    #[test]
    fn test_template_and_conditional_expressions() {
        let got = analyze(
            "<Text className={`row-${index}`}>{item.done ? label : item.name}</Text>",
            &["item", "index"],
            MergePolicy::Flatten,
        );
        assert_eq!(got, vec!["index", "item"]);
    }

    #[test]
    fn test_attribute_name_matching() {
        let allocator = Allocator::default();
        let expr = Parser::new(
            &allocator,
            r#"<block a:for-item="row" s-for-index="i" />"#,
            jsx_source_type(),
        )
        .parse_expression()
        .unwrap();
        let Expression::JSXElement(element) = &expr else {
            panic!("expected an element");
        };
        assert_eq!(string_attribute(&element.opening_element, "a:for-item"), Some("row"));
        assert_eq!(string_attribute(&element.opening_element, "s-for-index"), Some("i"));
        assert_eq!(string_attribute(&element.opening_element, "for-item"), None);
    }
}
