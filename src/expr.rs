//! Affine expressions.
//!
//! An [Expr] is a vector of affine forms over model variables stored in compressed row format:
//! element `i` is
//! ```text
//! sum_{k in ptr[i]..ptr[i+1]} cof[k] * x[subj[k]] + fix[i]
//! ```
//! Expressions are evaluated eagerly; every operation returns a new expression. Operations on
//! expressions of mismatching sizes panic, the same way indexing out of bounds does.

use itertools::izip;

use crate::variable::Variable;

#[derive(Clone,Debug,PartialEq)]
pub struct Expr {
    ptr  : Vec<usize>,
    subj : Vec<usize>,
    cof  : Vec<f64>,
    fix  : Vec<f64>,
}

/// Anything that can be used where an expression is expected.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr { fn into_expr(self) -> Expr { self } }
impl IntoExpr for &Expr { fn into_expr(self) -> Expr { self.clone() } }
impl IntoExpr for &Variable { fn into_expr(self) -> Expr { self.to_expr() } }
impl IntoExpr for Variable { fn into_expr(self) -> Expr { self.to_expr() } }
impl IntoExpr for f64 { fn into_expr(self) -> Expr { Expr::constant(&[self]) } }

impl Expr {
    /// Build an expression from raw compressed rows.
    ///
    /// # Arguments
    /// - `ptr` Row pointers, `ptr[0] == 0` and `ptr.len() == fix.len()+1`.
    /// - `subj`, `cof` Variable indexes and coefficients.
    /// - `fix` Constant term per element.
    pub fn from_raw(ptr : Vec<usize>, subj : Vec<usize>, cof : Vec<f64>, fix : Vec<f64>) -> Expr {
        if ptr.len() != fix.len()+1
            || ptr.first().copied() != Some(0)
            || ptr.last().copied() != Some(subj.len())
            || subj.len() != cof.len()
            || ptr.iter().zip(ptr[1..].iter()).any(|(a,b)| a > b) {
            panic!("Invalid expression data");
        }
        Expr{ ptr, subj, cof, fix }
    }

    /// A constant expression.
    pub fn constant(values : &[f64]) -> Expr {
        Expr{
            ptr  : vec![0; values.len()+1],
            subj : Vec::new(),
            cof  : Vec::new(),
            fix  : values.to_vec()
        }
    }

    pub(crate) fn from_variable(idxs : &[usize]) -> Expr {
        Expr{
            ptr  : (0..=idxs.len()).collect(),
            subj : idxs.to_vec(),
            cof  : vec![1.0; idxs.len()],
            fix  : vec![0.0; idxs.len()]
        }
    }

    pub fn len(&self) -> usize { self.fix.len() }
    pub fn is_empty(&self) -> bool { self.fix.is_empty() }

    /// Iterate over elements as `(subj,cof,fix)`.
    pub fn rows(&self) -> impl Iterator<Item = (&[usize],&[f64],f64)> {
        izip!(self.ptr.iter(),self.ptr[1..].iter(),self.fix.iter())
            .map(|(&p0,&p1,&f)| (&self.subj[p0..p1],&self.cof[p0..p1],f))
    }

    /// Evaluate the expression at the point `x`.
    pub fn eval(&self, x : &[f64]) -> Vec<f64> {
        self.rows()
            .map(|(subj,cof,fix)| subj.iter().zip(cof.iter()).map(|(&j,&c)| c * x[j]).sum::<f64>() + fix)
            .collect()
    }

    /// Sum all elements producing a scalar expression.
    pub fn sum(self) -> Expr {
        let fix = self.fix.iter().sum();
        Expr{
            ptr  : vec![0,self.subj.len()],
            subj : self.subj,
            cof  : self.cof,
            fix  : vec![fix]
        }
    }

    /// Inner product with a constant vector, producing a scalar expression.
    pub fn dot(self, c : &[f64]) -> Expr { self.mul_elem(c).sum() }

    /// Multiply every element by a scalar.
    pub fn mul(mut self, s : f64) -> Expr {
        self.cof.iter_mut().for_each(|c| *c *= s);
        self.fix.iter_mut().for_each(|c| *c *= s);
        self
    }

    /// Element-wise multiplication by a constant vector.
    pub fn mul_elem(mut self, c : &[f64]) -> Expr {
        if c.len() != self.len() {
            panic!("Mismatching operand shapes");
        }
        for (&p0,&p1,&ci,f) in izip!(self.ptr.iter(),self.ptr[1..].iter(),c.iter(),self.fix.iter_mut()) {
            self.cof[p0..p1].iter_mut().for_each(|v| *v *= ci);
            *f *= ci;
        }
        self
    }

    /// Element-wise sum. A scalar operand is broadcast.
    pub fn add<E : IntoExpr>(self, other : E) -> Expr {
        let other = other.into_expr();
        match (self.len(),other.len()) {
            (n,m) if n == m => self.merge(other),
            (_,1) => { let n = self.len(); self.merge(other.repeat(n)) },
            (1,m) => self.repeat(m).merge(other),
            _ => panic!("Mismatching operand shapes")
        }
    }

    /// Element-wise difference. A scalar operand is broadcast.
    pub fn sub<E : IntoExpr>(self, other : E) -> Expr { self.add(other.into_expr().mul(-1.0)) }

    /// Stack two expressions.
    pub fn vstack<E : IntoExpr>(mut self, other : E) -> Expr {
        let other = other.into_expr();
        let base = self.subj.len();
        self.ptr.extend(other.ptr[1..].iter().map(|&p| p+base));
        self.subj.extend_from_slice(&other.subj);
        self.cof.extend_from_slice(&other.cof);
        self.fix.extend_from_slice(&other.fix);
        self
    }

    /// Normalize each element: non-zeros sorted by variable index, duplicates merged and explicit
    /// zeros removed.
    pub fn finalize(self) -> Expr {
        let mut ptr  = Vec::with_capacity(self.ptr.len());
        let mut subj = Vec::with_capacity(self.subj.len());
        let mut cof  = Vec::with_capacity(self.cof.len());
        ptr.push(0);
        for (js,cs,_) in self.rows() {
            let mut terms : Vec<(usize,f64)> = js.iter().copied().zip(cs.iter().copied()).collect();
            terms.sort_by_key(|&(j,_)| j);
            let mut last : Option<usize> = None;
            for (j,c) in terms {
                if last == Some(j) {
                    if let Some(v) = cof.last_mut() { *v += c; }
                }
                else {
                    subj.push(j);
                    cof.push(c);
                    last = Some(j);
                }
            }
            // drop entries that cancelled out
            let p0 = *ptr.last().unwrap_or(&0);
            let mut k = p0;
            for i in p0..subj.len() {
                if cof[i] != 0.0 {
                    subj[k] = subj[i];
                    cof[k] = cof[i];
                    k += 1;
                }
            }
            subj.truncate(k);
            cof.truncate(k);
            ptr.push(k);
        }
        Expr{ ptr, subj, cof, fix : self.fix }
    }

    fn repeat(self, n : usize) -> Expr {
        (1..n).fold(self.clone(),|e,_| e.vstack(&self))
    }

    fn merge(self, other : Expr) -> Expr {
        let mut ptr  = Vec::with_capacity(self.ptr.len());
        let mut subj = Vec::with_capacity(self.subj.len()+other.subj.len());
        let mut cof  = Vec::with_capacity(self.cof.len()+other.cof.len());
        ptr.push(0);
        for ((js0,cs0,_),(js1,cs1,_)) in self.rows().zip(other.rows()) {
            subj.extend_from_slice(js0); subj.extend_from_slice(js1);
            cof.extend_from_slice(cs0); cof.extend_from_slice(cs1);
            ptr.push(subj.len());
        }
        let fix = self.fix.iter().zip(other.fix.iter()).map(|(a,b)| a+b).collect();
        Expr{ ptr, subj, cof, fix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_and_dot() {
        let e = Expr::from_variable(&[0,1,2]);
        let s = e.clone().sum();
        assert_eq!(s.len(),1);
        assert_eq!(s.eval(&[1.0,2.0,3.0]),vec![6.0]);
        let d = e.dot(&[1.0,0.0,-1.0]);
        assert_eq!(d.eval(&[1.0,2.0,3.0]),vec![-2.0]);
    }

    #[test]
    fn finalize_merges_and_drops() {
        let e = Expr::from_variable(&[2,0,2])
            .sum()
            .sub(Expr::from_variable(&[0]).mul(1.0))
            .finalize();
        let (subj,cof,fix) = e.rows().next().unwrap();
        assert_eq!(subj,&[2]);
        assert_eq!(cof,&[2.0]);
        assert_eq!(fix,0.0);
    }

    #[test]
    fn broadcast_scalar() {
        let e = Expr::from_variable(&[0,1]).sub(5.0);
        assert_eq!(e.eval(&[1.0,1.0]),vec![-4.0,-4.0]);
    }

    #[test]
    #[should_panic]
    fn mismatching_sizes() {
        let _ = Expr::from_variable(&[0,1]).add(Expr::from_variable(&[0,1,2]));
    }
}
