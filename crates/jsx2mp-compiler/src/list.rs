//! List transform: rewrites `collection.map(cb)` calls that render markup
//! inside an expression container into the host runtime's loop directive.
//!
//! ```text
//! <View>{arr.map((val, idx) => <item data-value={val} />)}</View>
//! ```
//!
//! becomes
//!
//! ```text
//! <View><block a:for={arr.map((val, idx) => ({val: val}))}
//!              a:for-item="val" a:for-index="idx"><item data-value={val} /></block></View>
//! ```
//!
//! The callback keeps running at runtime, but only to hand the template the
//! loop-scope values its body reads; the markup itself moves into the
//! wrapper element.

use indexmap::IndexSet;
use oxc_allocator::{Allocator, Box as ArenaBox, Vec as ArenaVec};
use oxc_ast::ast::{
    Argument, ArrowFunctionExpression, BindingIdentifier, BindingPattern, Expression,
    FormalParameters, Function, FunctionBody, JSXChild, JSXElement, JSXExpressionContainer,
    JSXFragment, Program, ReturnStatement, Statement,
};
use oxc_ast_visit::{Visit, VisitMut};
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;
use tracing::{debug, trace};

use crate::adapter::Adapter;
use crate::capture::CaptureAnalyzer;
use crate::context::{CaptureSet, LoopContextStack, LoopFrame, MergePolicy};
use crate::error::TransformError;
use crate::snippet::{collection_slot, Snippets};

pub use crate::snippet::LOOP_WRAPPER_TAG;

/// Item parameter name used when the callback declares none.
pub const DEFAULT_ITEM: &str = "item";
/// Index parameter name used when the callback declares none.
pub const DEFAULT_INDEX: &str = "index";

/// Rewrite every mapped list under `expr` for `adapter`, merging nested
/// captures with the default policy. `allocator` must own `expr`.
pub fn transform_list<'a>(
    allocator: &'a Allocator,
    expr: &mut Expression<'a>,
    adapter: &Adapter,
) -> Result<(), TransformError> {
    ListTransform::new(allocator, adapter).run(expr)
}

/// [`transform_list`] over every statement of a module.
pub fn transform_program_list<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    adapter: &Adapter,
) -> Result<(), TransformError> {
    ListTransform::new(allocator, adapter).run_program(program)
}

/// Shape of a matched callback body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyForm {
    /// `(x) => <El />`
    Expression,
    /// `(x) => { ...; return <El />; }`
    Block,
}

/// A `.map(callback)` call whose callback renders markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationMatch {
    /// Declared item parameter.
    pub item: Option<String>,
    /// Declared index parameter.
    pub index: Option<String>,
    pub body: BodyForm,
}

impl IterationMatch {
    pub fn item_name(&self) -> &str {
        self.item.as_deref().unwrap_or(DEFAULT_ITEM)
    }

    pub fn index_name(&self) -> &str {
        self.index.as_deref().unwrap_or(DEFAULT_INDEX)
    }
}

/// Recognise `collection.map(callback)` where the callback takes at most
/// two plain identifier parameters and produces exactly one markup value.
///
/// Parentheses around the call are looked through. Anything else, including
/// callbacks with several return statements, destructured parameters, or
/// async and generator callbacks, is not a match.
pub fn match_iteration(expr: &Expression<'_>) -> Option<IterationMatch> {
    let Expression::CallExpression(call) = expr.without_parentheses() else {
        return None;
    };
    if !is_map_callee(&call.callee) || call.arguments.len() != 1 {
        return None;
    }
    let (params, body, expression_body) = callback_parts(call.arguments.first()?)?;
    if params.items.len() > 2 || params.rest.is_some() {
        return None;
    }
    let mut names = Vec::with_capacity(2);
    for param in &params.items {
        match &param.pattern {
            BindingPattern::BindingIdentifier(ident) => names.push(ident.name.to_string()),
            _ => return None,
        }
    }
    let mut names = names.into_iter();

    let body = match expression_body {
        true if has_expression_markup(body) => BodyForm::Expression,
        false if has_block_markup_return(body) => BodyForm::Block,
        _ => return None,
    };

    Some(IterationMatch {
        item: names.next(),
        index: names.next(),
        body,
    })
}

fn is_map_callee(callee: &Expression<'_>) -> bool {
    matches!(
        callee.without_parentheses(),
        Expression::StaticMemberExpression(member) if member.property.name.as_str() == "map"
    )
}

fn is_map_call(expr: &Expression<'_>) -> bool {
    matches!(
        expr.without_parentheses(),
        Expression::CallExpression(call) if is_map_callee(&call.callee)
    )
}

fn is_markup(expr: &Expression<'_>) -> bool {
    matches!(
        expr.without_parentheses(),
        Expression::JSXElement(_) | Expression::JSXFragment(_)
    )
}

/// Parameters, body and expression-body flag of an inline callback.
fn callback_parts<'c, 'a>(
    arg: &'c Argument<'a>,
) -> Option<(&'c FormalParameters<'a>, &'c FunctionBody<'a>, bool)> {
    match arg {
        Argument::ArrowFunctionExpression(arrow) if !arrow.r#async => {
            Some((&*arrow.params, &*arrow.body, arrow.expression))
        }
        Argument::FunctionExpression(func) if !func.r#async && !func.generator => {
            Some((&*func.params, func.body.as_deref()?, false))
        }
        _ => None,
    }
}

fn callback_parts_mut<'c, 'a>(
    arg: &'c mut Argument<'a>,
) -> Option<(&'c mut FormalParameters<'a>, &'c mut FunctionBody<'a>, bool)> {
    match arg {
        Argument::ArrowFunctionExpression(arrow) => {
            let arrow = &mut **arrow;
            let expression = arrow.expression;
            Some((&mut *arrow.params, &mut *arrow.body, expression))
        }
        Argument::FunctionExpression(func) => {
            let func = &mut **func;
            Some((&mut *func.params, func.body.as_deref_mut()?, false))
        }
        _ => None,
    }
}

fn has_expression_markup(body: &FunctionBody<'_>) -> bool {
    matches!(
        body.statements.first(),
        Some(Statement::ExpressionStatement(stmt)) if is_markup(&stmt.expression)
    )
}

/// `true` if `body` has exactly one return statement, at its top level,
/// returning markup.
fn has_block_markup_return(body: &FunctionBody<'_>) -> bool {
    let mut counter = ReturnCounter::default();
    for stmt in &body.statements {
        counter.visit_statement(stmt);
    }
    counter.returns == 1
        && body.statements.iter().any(|stmt| {
            matches!(
                stmt,
                Statement::ReturnStatement(ret) if ret.argument.as_ref().is_some_and(|arg| is_markup(arg))
            )
        })
}

/// Counts return statements reachable without entering a nested function.
#[derive(Default)]
struct ReturnCounter {
    returns: usize,
}

impl<'a> Visit<'a> for ReturnCounter {
    fn visit_return_statement(&mut self, _it: &ReturnStatement<'a>) {
        self.returns += 1;
    }

    fn visit_function(&mut self, _it: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _it: &ArrowFunctionExpression<'a>) {}
}

/// Names a callback body declares at its top level: variables, functions
/// and classes. Initializers and nested scopes are not entered.
fn declared_names(body: &FunctionBody<'_>) -> IndexSet<String> {
    let mut collector = DeclaredNames::default();
    for stmt in &body.statements {
        match stmt {
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    collector.visit_binding_pattern(&declarator.id);
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    collector.visit_binding_identifier(id);
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    collector.visit_binding_identifier(id);
                }
            }
            _ => {}
        }
    }
    collector.names
}

#[derive(Default)]
struct DeclaredNames {
    names: IndexSet<String>,
}

impl<'a> Visit<'a> for DeclaredNames {
    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        self.names.insert(it.name.to_string());
    }

    // Default values and computed keys inside patterns.
    fn visit_expression(&mut self, _it: &Expression<'a>) {}
}

/// The slot holding the callback's result: the expression body, or the
/// argument of the top-level return.
fn return_slot_mut<'c, 'a>(
    body: &'c mut FunctionBody<'a>,
    expression_body: bool,
) -> Option<&'c mut Expression<'a>> {
    if expression_body {
        return match body.statements.first_mut()? {
            Statement::ExpressionStatement(stmt) => Some(&mut stmt.expression),
            _ => None,
        };
    }
    body.statements.iter_mut().find_map(|stmt| match stmt {
        Statement::ReturnStatement(ret) => ret.argument.as_mut(),
        _ => None,
    })
}

fn unparenthesized_mut<'e, 'a>(mut expr: &'e mut Expression<'a>) -> &'e mut Expression<'a> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = &mut paren.expression;
    }
    expr
}

fn unparenthesized(mut expr: Expression<'_>) -> Expression<'_> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = paren.unbox().expression;
    }
    expr
}

fn markup_child(markup: Expression<'_>) -> Option<JSXChild<'_>> {
    match markup {
        Expression::JSXElement(element) => Some(JSXChild::Element(element)),
        Expression::JSXFragment(fragment) => Some(JSXChild::Fragment(fragment)),
        _ => None,
    }
}

/// `{a: a, b: b}` in set order, allocated in `allocator`.
pub fn capture_object<'a>(
    allocator: &'a Allocator,
    captures: &CaptureSet,
) -> Result<Expression<'a>, TransformError> {
    Snippets::new(allocator).capture_object(captures)
}

/// Walks a tree and rewrites mapped lists, innermost first.
pub struct ListTransform<'a, 'o> {
    snippets: Snippets<'a>,
    adapter: &'o Adapter,
    policy: MergePolicy,
    stack: LoopContextStack,
    rewritten: usize,
    error: Option<TransformError>,
}

impl<'a, 'o> ListTransform<'a, 'o> {
    pub fn new(allocator: &'a Allocator, adapter: &'o Adapter) -> Self {
        Self {
            snippets: Snippets::new(allocator),
            adapter,
            policy: MergePolicy::default(),
            stack: LoopContextStack::new(),
            rewritten: 0,
            error: None,
        }
    }

    pub fn policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(mut self, expr: &mut Expression<'a>) -> Result<(), TransformError> {
        self.visit_expression(expr);
        self.finish()
    }

    pub fn run_program(mut self, program: &mut Program<'a>) -> Result<(), TransformError> {
        self.visit_program(program);
        self.finish()
    }

    fn finish(self) -> Result<(), TransformError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        debug!(loops = self.rewritten, "list transform finished");
        Ok(())
    }

    /// Children are visited by index and a matching container is replaced
    /// in place; siblings keep their position.
    fn visit_markup_children(&mut self, children: &mut ArenaVec<'a, JSXChild<'a>>) {
        for child in children.iter_mut() {
            if self.error.is_some() {
                return;
            }
            let replacement = match child {
                JSXChild::ExpressionContainer(container) => self.rewrite_container(container),
                _ => {
                    self.visit_jsx_child(child);
                    None
                }
            };
            if let Some(wrapper) = replacement {
                *child = JSXChild::Element(wrapper);
            }
        }
    }

    /// The loop wrapper replacing `container`, if it holds a mapped list.
    fn rewrite_container(
        &mut self,
        container: &mut JSXExpressionContainer<'a>,
    ) -> Option<ArenaBox<'a, JSXElement<'a>>> {
        let matched = container
            .expression
            .as_expression()
            .and_then(|expr| match_iteration(expr));
        let Some(matched) = matched else {
            if container.expression.as_expression().is_some_and(is_map_call) {
                trace!(
                    offset = container.span.start,
                    "map callback does not render a single element, left as is"
                );
            }
            self.visit_jsx_expression_container(container);
            return None;
        };
        match self.rewrite_iteration(container, &matched) {
            Ok(wrapper) => Some(wrapper),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }

    fn rewrite_iteration(
        &mut self,
        container: &mut JSXExpressionContainer<'a>,
        matched: &IterationMatch,
    ) -> Result<ArenaBox<'a, JSXElement<'a>>, TransformError> {
        let span = container.span;
        let missing = || TransformError::MissingReturn { span };

        let Some(Expression::CallExpression(call)) =
            container.expression.as_expression_mut().map(unparenthesized_mut)
        else {
            return Err(missing());
        };
        // The collection is evaluated in the enclosing scope.
        if let Expression::StaticMemberExpression(member) = unparenthesized_mut(&mut call.callee) {
            self.visit_expression(&mut member.object);
        }
        let (params, body, expression_body) = call
            .arguments
            .first_mut()
            .and_then(callback_parts_mut)
            .ok_or_else(missing)?;

        let item = matched.item_name().to_string();
        let index = matched.index_name().to_string();
        // Declared params are plain identifiers, so respelling the whole
        // list keeps them as they were.
        if params.items.len() < 2 {
            params.items = self.snippets.params(&[item.as_str(), index.as_str()])?;
        }

        let outer = self.stack.bindings();
        let depth = self.stack.depth();
        self.stack.push(item, index).locals = declared_names(body);
        self.visit_function_body(body);
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let mut frame = self.pop_frame(depth, span)?;

        let slot = return_slot_mut(body, expression_body).ok_or_else(missing)?;
        if !is_markup(slot) {
            return Err(missing());
        }
        frame.captures = self.captures_for(&frame, &outer, slot.without_parentheses());
        let object = self.snippets.capture_object(&frame.captures)?;
        let markup = unparenthesized(std::mem::replace(slot, object));

        debug!(
            item = %frame.item,
            index = %frame.index,
            captures = ?frame.captures,
            depth = self.stack.depth(),
            "rewrote mapped list"
        );
        self.stack.report(&frame);
        self.rewritten += 1;

        let mut wrapper = self
            .snippets
            .loop_wrapper(self.adapter, &frame.item, &frame.index)?;
        let placeholder = collection_slot(&mut wrapper).ok_or_else(|| TransformError::Snippet {
            code: LOOP_WRAPPER_TAG.to_string(),
            message: "loop wrapper has no collection attribute".to_string(),
        })?;
        let collection = container
            .expression
            .as_expression_mut()
            .map(unparenthesized_mut)
            .ok_or_else(missing)?;
        std::mem::swap(placeholder, collection);
        wrapper
            .children
            .push(markup_child(markup).ok_or_else(missing)?);
        Ok(wrapper)
    }

    /// Close the frame opened at `depth`. Any other stack height means an
    /// inner rewrite left frames behind.
    fn pop_frame(&mut self, depth: usize, span: Span) -> Result<LoopFrame, TransformError> {
        if self.stack.depth() != depth + 1 {
            return Err(TransformError::UnbalancedLoopStack { span });
        }
        self.stack
            .pop()
            .ok_or(TransformError::UnbalancedLoopStack { span })
    }

    /// Names the rewritten callback has to hand to the template.
    fn captures_for(
        &self,
        frame: &LoopFrame,
        outer: &IndexSet<String>,
        markup: &Expression<'_>,
    ) -> CaptureSet {
        let mut bound: IndexSet<String> = [frame.item.clone(), frame.index.clone()]
            .into_iter()
            .collect();
        bound.extend(frame.locals.iter().cloned());
        bound.extend(outer.iter().cloned());
        if self.policy == MergePolicy::Flatten {
            bound.extend(frame.inner_bindings.iter().cloned());
        }

        let mut captures = CaptureAnalyzer::new(&bound)
            .policy(self.policy)
            .loop_attributes(self.adapter)
            .analyze_expr(markup);
        captures.extend(frame.inner_captures.iter().cloned());
        captures
    }
}

impl<'a> VisitMut<'a> for ListTransform<'a, '_> {
    // Attribute values are never rewritten, only searched for markup.
    fn visit_jsx_element(&mut self, it: &mut JSXElement<'a>) {
        self.visit_jsx_opening_element(&mut it.opening_element);
        self.visit_markup_children(&mut it.children);
    }

    fn visit_jsx_fragment(&mut self, it: &mut JSXFragment<'a>) {
        self.visit_markup_children(&mut it.children);
    }
}
