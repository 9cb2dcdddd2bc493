//! Ingredient catalog.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// A candidate ingredient.
///
/// Property contributions are per unit of quantity. A property an ingredient does not list
/// contributes nothing.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ingredient {
    pub name         : String,
    /// Cost per unit.
    pub cost         : f64,
    /// One-off cost charged if the ingredient is used at all.
    #[serde(default)]
    pub fee          : f64,
    /// Upper bound on the usable quantity.
    pub availability : f64,
    #[serde(default)]
    pub properties   : BTreeMap<String,f64>,
}

impl Ingredient {
    pub fn new(name : &str, cost : f64, availability : f64) -> Ingredient {
        Ingredient{
            name : name.to_string(),
            cost,
            fee : 0.0,
            availability,
            properties : BTreeMap::new()
        }
    }

    pub fn with_fee(self, fee : f64) -> Ingredient { Ingredient{ fee, ..self } }

    pub fn with_property(mut self, name : &str, contribution : f64) -> Ingredient {
        self.properties.insert(name.to_string(),contribution);
        self
    }

    /// Per-unit contribution to `property`.
    pub fn contribution(&self, property : &str) -> f64 {
        self.properties.get(property).copied().unwrap_or(0.0)
    }

    fn validate(&self) -> Result<(),ConfigurationError> {
        for (what,value) in [("cost",self.cost),("fee",self.fee),("availability",self.availability)] {
            let what = format!("{} of '{}'",what,self.name);
            if !value.is_finite() {
                return Err(ConfigurationError::NonFinite{ what, value });
            }
            if value < 0.0 {
                return Err(ConfigurationError::NegativeValue{ what, value });
            }
        }
        match self.properties.iter().find(|(_,v)| !v.is_finite()) {
            Some((p,&value)) => Err(ConfigurationError::NonFinite{ what : format!("property '{}' of '{}'",p,self.name), value }),
            None => Ok(())
        }
    }
}

/// An ordered set of ingredients with unique names. The order defines the column order of the
/// generated model.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(try_from = "Vec<Ingredient>", into = "Vec<Ingredient>")]
pub struct Catalog {
    ingredients : Vec<Ingredient>,
}

impl Catalog {
    /// Create a catalog, validating every ingredient.
    ///
    /// # Errors
    /// Duplicate names, and negative or non-finite cost, fee or availability.
    pub fn new(ingredients : Vec<Ingredient>) -> Result<Catalog,ConfigurationError> {
        let mut seen = HashSet::new();
        for ing in ingredients.iter() {
            if !seen.insert(ing.name.as_str()) {
                return Err(ConfigurationError::DuplicateIngredient(ing.name.clone()));
            }
            ing.validate()?;
        }
        Ok(Catalog{ ingredients })
    }

    pub fn len(&self) -> usize { self.ingredients.len() }
    pub fn is_empty(&self) -> bool { self.ingredients.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_,Ingredient> { self.ingredients.iter() }
    pub fn ingredients(&self) -> &[Ingredient] { self.ingredients.as_slice() }
    pub fn get(&self, name : &str) -> Option<&Ingredient> { self.ingredients.iter().find(|i| i.name == name) }
    pub fn position(&self, name : &str) -> Option<usize> { self.ingredients.iter().position(|i| i.name == name) }

    /// Names of all properties mentioned by any ingredient.
    pub fn property_names(&self) -> BTreeSet<&str> {
        self.ingredients.iter().flat_map(|i| i.properties.keys().map(|k| k.as_str())).collect()
    }

    pub fn costs(&self) -> Vec<f64> { self.ingredients.iter().map(|i| i.cost).collect() }
    pub fn fees(&self) -> Vec<f64> { self.ingredients.iter().map(|i| i.fee).collect() }
    pub fn availabilities(&self) -> Vec<f64> { self.ingredients.iter().map(|i| i.availability).collect() }
    pub fn contributions(&self, property : &str) -> Vec<f64> { self.ingredients.iter().map(|i| i.contribution(property)).collect() }
}

impl TryFrom<Vec<Ingredient>> for Catalog {
    type Error = ConfigurationError;
    fn try_from(ingredients : Vec<Ingredient>) -> Result<Catalog,ConfigurationError> { Catalog::new(ingredients) }
}

impl From<Catalog> for Vec<Ingredient> {
    fn from(c : Catalog) -> Vec<Ingredient> { c.ingredients }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Ingredient;
    type IntoIter = std::slice::Iter<'a,Ingredient>;
    fn into_iter(self) -> Self::IntoIter { self.ingredients.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names() {
        let r = Catalog::new(vec![Ingredient::new("A",1.0,10.0), Ingredient::new("A",2.0,10.0)]);
        assert!(matches!(r, Err(ConfigurationError::DuplicateIngredient(n)) if n == "A"));
    }

    #[test]
    fn negative_values() {
        assert!(matches!(Catalog::new(vec![Ingredient::new("A",-1.0,10.0)]), Err(ConfigurationError::NegativeValue{..})));
        assert!(matches!(Catalog::new(vec![Ingredient::new("A",1.0,10.0).with_fee(-2.0)]), Err(ConfigurationError::NegativeValue{..})));
        assert!(matches!(Catalog::new(vec![Ingredient::new("A",1.0,f64::INFINITY)]), Err(ConfigurationError::NonFinite{..})));
        assert!(matches!(Catalog::new(vec![Ingredient::new("A",1.0,1.0).with_property("p",f64::NAN)]), Err(ConfigurationError::NonFinite{..})));
    }

    #[test]
    fn missing_property_is_zero() {
        let c = Catalog::new(vec![Ingredient::new("A",1.0,10.0).with_property("color",2.0),
                                  Ingredient::new("B",1.0,10.0).with_property("body",1.0)]).unwrap();
        assert_eq!(c.contributions("color"),vec![2.0,0.0]);
        assert_eq!(c.property_names().into_iter().collect::<Vec<_>>(),vec!["body","color"]);
        assert_eq!(c.position("B"),Some(1));
    }
}
