//! Named multi-valued attributes shared by all identity types.

use std::collections::HashMap;

/// Attribute name to values.
pub type Attributes = HashMap<String, Vec<String>>;

/// Access to an entity's custom attributes.
///
/// Setting an attribute to an empty value list is the same as removing it,
/// so an attribute that is present always has at least one value.
pub trait AttributeHolder {
    /// Returns the attribute map.
    fn attributes(&self) -> &Attributes;

    /// Returns the attribute map for modification.
    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Replaces the values of an attribute.
    ///
    /// Returns `true` if the stored attributes changed.
    fn set_attribute(&mut self, name: &str, values: Vec<String>) -> bool {
        if values.is_empty() {
            return self.remove_attribute(name).is_some();
        }
        let previous = self.attributes_mut().insert(name.to_string(), values.clone());
        previous.as_ref() != Some(&values)
    }

    /// Removes an attribute, returning its former values.
    fn remove_attribute(&mut self, name: &str) -> Option<Vec<String>> {
        self.attributes_mut().remove(name)
    }

    /// Gets the values of an attribute.
    fn attribute_values(&self, name: &str) -> Option<&[String]> {
        self.attributes()
            .get(name)
            .map(Vec::as_slice)
            .filter(|values| !values.is_empty())
    }

    /// Gets the first value of an attribute.
    fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attribute_values(name)
            .and_then(<[String]>::first)
            .map(String::as_str)
    }
}
