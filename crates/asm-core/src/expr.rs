//! Expression IR and base-resolution (spec §3, §4.5, grounded on
//! `eval_expr`/`find_base` in the reference assembler).
//!
//! This IR is intentionally minimal: it is the representation the resolver
//! and symbol finaliser operate on, not a general-purpose expression
//! language. A front-end that needs richer operators lowers them into
//! these five forms before an atom reaches the core.

use asm_backend::SymbolId;

/// A constant or symbolic expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Number(i64),
    Sym(SymbolId),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    #[must_use]
    pub fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    #[must_use]
    pub fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

/// Resolves every [`Expr::Sym`] leaf to a constant value, looking up
/// `Labsym`/`Expression` symbols via `resolve_sym`. Returns `None` if any
/// symbol is still undefined or not yet constant (the caller reports this
/// as "expression must be constant", error 30).
pub fn eval_constant(expr: &Expr, resolve_sym: &mut dyn FnMut(SymbolId) -> Option<i64>) -> Option<i64> {
    match expr {
        Expr::Number(n) => Some(*n),
        Expr::Sym(s) => resolve_sym(*s),
        Expr::Add(a, b) => Some(eval_constant(a, resolve_sym)? + eval_constant(b, resolve_sym)?),
        Expr::Sub(a, b) => Some(eval_constant(a, resolve_sym)? - eval_constant(b, resolve_sym)?),
        Expr::Neg(a) => Some(-eval_constant(a, resolve_sym)?),
    }
}

/// Outcome of walking an expression tree looking for its relocatable base,
/// mirroring `BASE_OK`/`BASE_ILLEGAL`/`BASE_PCREL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseResult {
    /// No relocatable symbol in the expression (it is already constant).
    None,
    /// Exactly one relocatable symbol found, with unit coefficient.
    Ok(SymbolId),
    /// More than one relocatable symbol, or a non-unit coefficient, found.
    Illegal,
    /// A PC-relative base was found. Never produced by this IR (there is
    /// no PC-relative leaf form) but kept so the resolution call sites can
    /// match it the same way the reference assembler does, should a future
    /// front-end add one.
    PcRel,
}

/// `is_relocatable` callback: tells `find_base` which symbols count as a
/// "base" instead of a plain constant (i.e. `Labsym`/imported symbols, not
/// already-resolved `Expression` equates).
pub fn find_base(expr: &Expr, is_relocatable: &dyn Fn(SymbolId) -> bool) -> BaseResult {
    linear_form(expr, is_relocatable, false)
}

fn linear_form(expr: &Expr, is_relocatable: &dyn Fn(SymbolId) -> bool, negated: bool) -> BaseResult {
    match expr {
        Expr::Number(_) => BaseResult::None,
        Expr::Sym(s) => {
            if is_relocatable(*s) {
                if negated {
                    // A relocatable symbol with a non-unit (here: -1)
                    // coefficient can never form a valid base.
                    BaseResult::Illegal
                } else {
                    BaseResult::Ok(*s)
                }
            } else {
                BaseResult::None
            }
        }
        Expr::Neg(a) => linear_form(a, is_relocatable, !negated),
        Expr::Add(a, b) | Expr::Sub(a, b) => {
            let rb = if matches!(expr, Expr::Sub(_, _)) { !negated } else { negated };
            let left = linear_form(a, is_relocatable, negated);
            let right = linear_form(b, is_relocatable, rb);
            combine(left, right)
        }
    }
}

fn combine(left: BaseResult, right: BaseResult) -> BaseResult {
    match (left, right) {
        (BaseResult::Illegal, _) | (_, BaseResult::Illegal) => BaseResult::Illegal,
        (BaseResult::PcRel, _) | (_, BaseResult::PcRel) => BaseResult::PcRel,
        (BaseResult::None, other) | (other, BaseResult::None) => other,
        (BaseResult::Ok(_), BaseResult::Ok(_)) => BaseResult::Illegal,
    }
}
