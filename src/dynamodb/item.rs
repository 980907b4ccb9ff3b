use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

/// A DynamoDB item, carried from the source scan to the destination write
/// without looking at its contents.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) attributes: HashMap<String, AttributeValue>,
}

impl Item {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a string attribute.
    #[cfg(test)]
    pub fn set_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::S(value.into()));
        self
    }

    /// Projects the item onto the given key attributes.
    ///
    /// Returns `None` if one of them is missing.
    #[cfg(test)]
    pub fn key<'a>(&self, key_names: impl IntoIterator<Item = &'a str>) -> Option<Item> {
        let mut key = Item::new();
        for name in key_names {
            let value = self.attributes.get(name)?;
            key.attributes.insert(name.to_string(), value.clone());
        }
        Some(key)
    }

    pub fn into_attributes(self) -> HashMap<String, AttributeValue> {
        self.attributes
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }
}

/// Continuation token of a paginated scan (the last evaluated key).
///
/// Opaque to the copy loop: it is handed back unchanged to the next
/// `scan_page` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCursor(pub(crate) HashMap<String, AttributeValue>);

impl ScanCursor {
    pub fn into_inner(self) -> HashMap<String, AttributeValue> {
        self.0
    }
}

/// One page of scan results.
#[derive(Debug, Default)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// `None` once the end of the table is reached.
    pub next: Option<ScanCursor>,
}
