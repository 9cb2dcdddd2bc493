//! Target specification: size window, normalized property windows and the cardinality limit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Relative tolerance used when checking realized values against a window.
pub const WINDOW_TOLERANCE : f64 = 1e-6;

/// A closed interval `[min,max]`.
#[derive(Clone,Copy,Debug,PartialEq,Serialize,Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Window {
    pub min : f64,
    pub max : f64,
}

impl Window {
    pub fn new(min : f64, max : f64) -> Window { Window{ min, max } }

    /// Check `min <= v <= max` with a tolerance relative to the magnitude of the bound.
    pub fn contains(&self, v : f64, rtol : f64) -> bool {
        v >= self.min - rtol * self.min.abs().max(1.0) && v <= self.max + rtol * self.max.abs().max(1.0)
    }

    fn validate(&self, what : &str) -> Result<(),ConfigurationError> {
        for value in [self.min,self.max] {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFinite{ what : what.to_string(), value });
            }
        }
        if self.min > self.max {
            return Err(ConfigurationError::InvalidWindow{ what : what.to_string(), min : self.min, max : self.max });
        }
        Ok(())
    }
}

/// Scalar targets for one blend.
///
/// ```
/// use blendmodel::TargetSpec;
/// let t = TargetSpec::new(180.0,200.0,4)
///     .with_property("color",2.5,5.0)
///     .with_property("body",1.15,1.45);
/// assert!(t.validate().is_ok());
/// assert!(TargetSpec::new(10.0,5.0,1).validate().is_err());
/// ```
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Minimum total mixture size.
    pub total_min                : f64,
    /// Maximum total mixture size.
    pub total_max                : f64,
    /// Window for the quantity-weighted average of each tracked property.
    #[serde(default)]
    pub properties               : BTreeMap<String,Window>,
    /// Maximum number of distinct active ingredients. Signed so that a negative value in a
    /// configuration file is reported rather than rejected by the parser.
    pub max_distinct_ingredients : i64,
    /// Optional lower bounds on individual ingredients' share of the total.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub min_shares               : BTreeMap<String,f64>,
}

impl TargetSpec {
    pub fn new(total_min : f64, total_max : f64, max_distinct_ingredients : i64) -> TargetSpec {
        TargetSpec{
            total_min,
            total_max,
            properties : BTreeMap::new(),
            max_distinct_ingredients,
            min_shares : BTreeMap::new()
        }
    }

    pub fn with_property(mut self, name : &str, min : f64, max : f64) -> TargetSpec {
        self.properties.insert(name.to_string(),Window::new(min,max));
        self
    }

    /// Require `quantity(name) >= share * total`.
    pub fn with_min_share(mut self, name : &str, share : f64) -> TargetSpec {
        self.min_shares.insert(name.to_string(),share);
        self
    }

    pub fn total(&self) -> Window { Window::new(self.total_min,self.total_max) }

    /// Check that the targets are self-consistent: every window has `min <= max`, all values are
    /// finite, sizes and the cardinality limit are non-negative and shares lie in `[0,1]`.
    pub fn validate(&self) -> Result<(),ConfigurationError> {
        self.total().validate("total")?;
        if self.total_min < 0.0 {
            return Err(ConfigurationError::NegativeValue{ what : "total_min".to_string(), value : self.total_min });
        }
        for (name,w) in self.properties.iter() {
            w.validate(&format!("property '{}'",name))?;
        }
        if self.max_distinct_ingredients < 0 {
            return Err(ConfigurationError::NegativeCardinality(self.max_distinct_ingredients));
        }
        match self.min_shares.iter().find(|(_,&s)| !(0.0..=1.0).contains(&s)) {
            Some((name,&share)) => Err(ConfigurationError::InvalidShare{ name : name.clone(), share }),
            None => Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_windows() {
        assert!(matches!(TargetSpec::new(200.0,180.0,4).validate(), Err(ConfigurationError::InvalidWindow{..})));
        let t = TargetSpec::new(1.0,2.0,4).with_property("color",5.0,2.5);
        match t.validate() {
            Err(ConfigurationError::InvalidWindow{ what, min, max }) => {
                assert_eq!(what,"property 'color'");
                assert_eq!((min,max),(5.0,2.5));
            },
            r => panic!("unexpected {:?}",r)
        }
    }

    #[test]
    fn cardinality_and_shares() {
        assert!(matches!(TargetSpec::new(1.0,2.0,-1).validate(), Err(ConfigurationError::NegativeCardinality(-1))));
        assert!(TargetSpec::new(1.0,2.0,0).validate().is_ok());
        assert!(matches!(TargetSpec::new(1.0,2.0,1).with_min_share("A",1.5).validate(), Err(ConfigurationError::InvalidShare{..})));
        assert!(matches!(TargetSpec::new(-1.0,2.0,1).validate(), Err(ConfigurationError::NegativeValue{..})));
        assert!(matches!(TargetSpec::new(1.0,f64::NAN,1).validate(), Err(ConfigurationError::NonFinite{..})));
    }

    #[test]
    fn window_tolerance() {
        let w = Window::new(2.5,5.0);
        assert!(w.contains(5.0 + 1e-7, WINDOW_TOLERANCE));
        assert!(!w.contains(5.0 + 1e-4, WINDOW_TOLERANCE));
        assert!(w.contains(2.5 - 1e-6, WINDOW_TOLERANCE));
        let w0 = Window::new(0.0,0.0);
        assert!(w0.contains(-5e-7, WINDOW_TOLERANCE));
    }
}
