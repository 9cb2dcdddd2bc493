//! Linear domains for variables and constraints.
//!
//! A domain defines the bounds, the size and the integrality of a model item. Domains come in two
//! flavours:
//! - [ScalableLinearDomain], as produced by [greater_than]`(1.0)`, [nonnegative] or [in_range],
//!   which has no size of its own and is broadcast to whatever it is applied to. Used for a
//!   variable it yields a scalar unless [ScalableLinearDomain::with_shape] is used.
//! - [LinearDomain], which carries one bound pair per element, as produced by
//!   `greater_than(vec![1.0,2.0])`.
//!
//! ```
//! use blendmodel::*;
//! let mut m = Model::new(Some("domains"));
//! let x = m.variable(Some("x"), nonnegative().with_shape(3));
//! let z = m.variable(Some("z"), in_range(0.0,1.0).integer().with_shape(3));
//! assert_eq!(x.len(),3);
//! assert!(m.columns()[z.idxs()[0]].is_integer());
//! ```

use crate::error::ModelError;

/// A domain without a size. Scalar bounds are repeated for every element.
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct ScalableLinearDomain {
    lower      : f64,
    upper      : f64,
    is_integer : bool,
}

/// A sized domain: element `i` is restricted to `[lower[i],upper[i]]`.
#[derive(Clone,Debug,PartialEq)]
pub struct LinearDomain {
    lower      : Vec<f64>,
    upper      : Vec<f64>,
    is_integer : bool,
}

impl ScalableLinearDomain {
    pub fn integer(self) -> ScalableLinearDomain { ScalableLinearDomain{ is_integer : true, ..self } }
    pub fn continuous(self) -> ScalableLinearDomain { ScalableLinearDomain{ is_integer : false, ..self } }
    pub fn with_shape(self, n : usize) -> LinearDomain {
        LinearDomain{
            lower      : vec![self.lower; n],
            upper      : vec![self.upper; n],
            is_integer : self.is_integer
        }
    }
}

impl LinearDomain {
    pub fn integer(self) -> LinearDomain { LinearDomain{ is_integer : true, ..self } }
    pub fn continuous(self) -> LinearDomain { LinearDomain{ is_integer : false, ..self } }
    pub fn len(&self) -> usize { self.lower.len() }
    pub fn is_empty(&self) -> bool { self.lower.is_empty() }
    pub fn lower(&self) -> &[f64] { self.lower.as_slice() }
    pub fn upper(&self) -> &[f64] { self.upper.as_slice() }
    pub fn is_integer(&self) -> bool { self.is_integer }

    /// Split into `(lower,upper,is_integer)`.
    pub fn dissolve(self) -> (Vec<f64>,Vec<f64>,bool) { (self.lower,self.upper,self.is_integer) }
}

/// Something that can be turned into a [LinearDomain] of a given size.
pub trait IntoLinearDomain {
    /// The size the domain defines by itself, if any.
    fn size_hint(&self) -> Option<usize>;
    /// Produce a domain of size `n`, checking bounds consistency.
    fn try_into_domain(self, n : usize) -> Result<LinearDomain,ModelError>;
}

fn check_bounds(lower : &[f64], upper : &[f64]) -> Result<(),ModelError> {
    match lower.iter().zip(upper.iter()).find(|&(&l,&u)| l.is_nan() || u.is_nan() || l > u) {
        Some((&lower,&upper)) => Err(ModelError::InvalidBounds{ lower, upper }),
        None => Ok(())
    }
}

impl IntoLinearDomain for ScalableLinearDomain {
    fn size_hint(&self) -> Option<usize> { None }
    fn try_into_domain(self, n : usize) -> Result<LinearDomain,ModelError> {
        check_bounds(&[self.lower],&[self.upper])?;
        Ok(self.with_shape(n))
    }
}

impl IntoLinearDomain for LinearDomain {
    fn size_hint(&self) -> Option<usize> { Some(self.len()) }
    fn try_into_domain(self, n : usize) -> Result<LinearDomain,ModelError> {
        if n != self.len() {
            return Err(ModelError::SizeMismatch{ expr : n, domain : self.len() });
        }
        check_bounds(&self.lower,&self.upper)?;
        Ok(self)
    }
}

/// Offsets that can be used as bounds: scalars produce scalable domains, vectors produce sized
/// domains.
pub trait OffsetTrait {
    type Result;
    fn greater_than(self) -> Self::Result;
    fn less_than(self)    -> Self::Result;
    fn equal_to(self)     -> Self::Result;
}

impl OffsetTrait for f64 {
    type Result = ScalableLinearDomain;
    fn greater_than(self) -> ScalableLinearDomain { ScalableLinearDomain{ lower : self,              upper : f64::INFINITY, is_integer : false } }
    fn less_than(self)    -> ScalableLinearDomain { ScalableLinearDomain{ lower : f64::NEG_INFINITY, upper : self,          is_integer : false } }
    fn equal_to(self)     -> ScalableLinearDomain { ScalableLinearDomain{ lower : self,              upper : self,          is_integer : false } }
}

impl OffsetTrait for Vec<f64> {
    type Result = LinearDomain;
    fn greater_than(self) -> LinearDomain { let n = self.len(); LinearDomain{ lower : self,                          upper : vec![f64::INFINITY; n], is_integer : false } }
    fn less_than(self)    -> LinearDomain { let n = self.len(); LinearDomain{ lower : vec![f64::NEG_INFINITY; n],    upper : self,                   is_integer : false } }
    fn equal_to(self)     -> LinearDomain { LinearDomain{ lower : self.clone(), upper : self, is_integer : false } }
}

impl OffsetTrait for &[f64] {
    type Result = LinearDomain;
    fn greater_than(self) -> LinearDomain { self.to_vec().greater_than() }
    fn less_than(self)    -> LinearDomain { self.to_vec().less_than() }
    fn equal_to(self)     -> LinearDomain { self.to_vec().equal_to() }
}

pub fn greater_than<T : OffsetTrait>(v : T) -> T::Result { v.greater_than() }
pub fn less_than<T : OffsetTrait>(v : T) -> T::Result { v.less_than() }
pub fn equal_to<T : OffsetTrait>(v : T) -> T::Result { v.equal_to() }
/// Domain `[lower,upper]`.
pub fn in_range(lower : f64, upper : f64) -> ScalableLinearDomain { ScalableLinearDomain{ lower, upper, is_integer : false } }
/// Domain `[0,∞)`.
pub fn nonnegative() -> ScalableLinearDomain { greater_than(0.0) }
