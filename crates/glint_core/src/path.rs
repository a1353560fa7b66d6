//! Dotted attribute paths
//!
//! A [`PropertyPath`] such as `"address.street"` names the `street` attribute
//! of the object held in `address`. Intermediate hops must hold objects; a hop
//! that is `Nil` at runtime makes the whole path read as `Nil`.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{CoreError, Result};
use crate::proxy::ObjectRef;
use crate::value::Value;

/// A parsed attribute path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    raw: String,
    segments: SmallVec<[String; 2]>,
}

impl PropertyPath {
    /// Parse `a.b.c`; empty paths and empty segments are rejected
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::EmptyPath);
        }
        let segments: SmallVec<[String; 2]> = raw.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(CoreError::EmptyPath);
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final attribute name
    pub fn leaf(&self) -> &str {
        // parse() guarantees at least one segment
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Check that every reachable hop declares the next segment
    ///
    /// Hops that are currently `Nil` cannot be checked further and are accepted.
    pub fn validate(&self, root: &ObjectRef) -> Result<()> {
        let mut current = root.clone();
        for (index, segment) in self.segments.iter().enumerate() {
            if !current.has_property(segment) {
                return Err(CoreError::UnknownProperty {
                    object: current.type_name().to_string(),
                    property: self.prefix(index + 1),
                });
            }
            if index + 1 == self.segments.len() {
                break;
            }
            match current.get_property(segment)? {
                Value::Object(next) => current = next,
                Value::Nil => return Ok(()),
                _ => return Err(self.not_an_object(index)),
            }
        }
        Ok(())
    }

    /// Walk to the object owning the leaf attribute
    ///
    /// Returns `Ok(None)` when an intermediate hop is `Nil`.
    pub fn resolve_owner(&self, root: &ObjectRef) -> Result<Option<ObjectRef>> {
        let mut current = root.clone();
        let hops = self.segments.len() - 1;
        for (index, segment) in self.segments[..hops].iter().enumerate() {
            match current.get_property(segment)? {
                Value::Object(next) => current = next,
                Value::Nil => return Ok(None),
                _ => return Err(self.not_an_object(index)),
            }
        }
        Ok(Some(current))
    }

    /// Read the value at the end of the path
    pub fn read(&self, root: &ObjectRef) -> Result<Value> {
        match self.resolve_owner(root)? {
            Some(owner) => owner.get_property(self.leaf()),
            None => Ok(Value::Nil),
        }
    }

    /// Write the value at the end of the path
    ///
    /// Returns `Ok(false)` when an intermediate hop is `Nil` and nothing was written.
    pub fn write(&self, root: &ObjectRef, value: Value) -> Result<bool> {
        match self.resolve_owner(root)? {
            Some(owner) => {
                owner.set_property(self.leaf(), value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The objects along the path with the segment each one holds
    ///
    /// Stops early at a hop that is not an object.
    pub fn chain(&self, root: &ObjectRef) -> Vec<(ObjectRef, String)> {
        let mut chain = Vec::with_capacity(self.segments.len());
        let mut current = root.clone();
        for (index, segment) in self.segments.iter().enumerate() {
            chain.push((current.clone(), segment.clone()));
            if index + 1 == self.segments.len() {
                break;
            }
            match current.get_property(segment) {
                Ok(Value::Object(next)) => current = next,
                _ => break,
            }
        }
        chain
    }

    fn prefix(&self, len: usize) -> String {
        self.segments[..len].join(".")
    }

    fn not_an_object(&self, index: usize) -> CoreError {
        CoreError::NotAnObject {
            path: self.raw.clone(),
            segment: self.segments[index].clone(),
        }
    }
}

impl FromStr for PropertyPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        PropertyPath::parse(s)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    fn person() -> ObjectRef {
        let address = Model::with_attributes("Address", [("street", "Main St")]);
        Model::builder("Person")
            .attr("name", "Ann")
            .attr("address", Value::object(address))
            .attr("employer", Value::Nil)
            .attr("age", 30)
            .build()
    }

    #[test]
    fn test_parse() {
        let path = PropertyPath::parse("address.street").unwrap();
        assert_eq!(path.segments(), ["address", "street"]);
        assert_eq!(path.leaf(), "street");
        assert!(path.is_nested());
        assert_eq!(PropertyPath::parse(""), Err(CoreError::EmptyPath));
        assert_eq!(PropertyPath::parse("a..b"), Err(CoreError::EmptyPath));
    }

    #[test]
    fn test_read_write_nested() {
        let root = person();
        let path = PropertyPath::parse("address.street").unwrap();
        assert_eq!(path.read(&root).unwrap(), Value::from("Main St"));
        assert!(path.write(&root, "High St".into()).unwrap());
        assert_eq!(path.read(&root).unwrap(), Value::from("High St"));
    }

    #[test]
    fn test_nil_hop_reads_nil() {
        let root = person();
        let path = PropertyPath::parse("employer.name").unwrap();
        assert!(path.validate(&root).is_ok());
        assert_eq!(path.read(&root).unwrap(), Value::Nil);
        assert!(!path.write(&root, "Acme".into()).unwrap());
    }

    #[test]
    fn test_validate_rejects_unknown_and_scalar_hops() {
        let root = person();
        assert!(matches!(
            PropertyPath::parse("address.zip").unwrap().validate(&root),
            Err(CoreError::UnknownProperty { .. })
        ));
        assert!(matches!(
            PropertyPath::parse("age.years").unwrap().validate(&root),
            Err(CoreError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_chain() {
        let root = person();
        let chain = PropertyPath::parse("address.street").unwrap().chain(&root);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].1, "address");
        assert_eq!(chain[1].1, "street");
    }
}
