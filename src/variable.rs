//! Module for Variable object and related implementations

use crate::expr::Expr;

/// A Variable object is basically a wrapper around a variable index list. It contains no
/// reference to the [crate::Model] object it belongs to, so in a context of multiple Models, it is
/// not possible to verify that it is used with the originating model.
///
/// ```
/// use blendmodel::*;
///
/// let mut model = Model::new(None);
/// let x = model.variable(Some("x"), nonnegative().with_shape(3));
/// // sum(x) == 1
/// model.constraint(Some("budget"), x.sum(), equal_to(1.0));
/// // x[0] - 2 x[1] <= 0
/// model.constraint(None, x.index(0).to_expr().sub(x.index(1).to_expr().mul(2.0)), less_than(0.0));
/// ```
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Variable {
    idxs : Vec<usize>,
}

impl Variable {
    pub(crate) fn new(idxs : Vec<usize>) -> Variable { Variable{ idxs } }

    /// Model column indexes of the elements.
    pub fn idxs(&self) -> &[usize] { self.idxs.as_slice() }
    pub fn len(&self) -> usize { self.idxs.len() }
    pub fn is_empty(&self) -> bool { self.idxs.is_empty() }

    /// Pick a single element as a variable of size 1. Panics if `i` is out of bounds.
    pub fn index(&self, i : usize) -> Variable {
        if i >= self.idxs.len() {
            panic!("Variable index {} out of bounds for variable of size {}",i,self.idxs.len());
        }
        Variable{ idxs : vec![self.idxs[i]] }
    }

    pub fn to_expr(&self) -> Expr { Expr::from_variable(&self.idxs) }
    pub fn sum(&self) -> Expr { self.to_expr().sum() }
    pub fn dot(&self, c : &[f64]) -> Expr { self.to_expr().dot(c) }
    pub fn mul_elem(&self, c : &[f64]) -> Expr { self.to_expr().mul_elem(c) }
}
