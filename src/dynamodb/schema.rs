use std::fmt;

/// Type of a key attribute in a DynamoDB table schema.
///
/// Only scalar types can be declared in attribute definitions; every other
/// attribute of an item is schemaless and never shows up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `S`
    String,
    /// `N`
    Number,
    /// `B`
    Binary,
}

impl FieldType {
    /// Returns the DynamoDB type code.
    pub fn code(&self) -> &'static str {
        match self {
            FieldType::String => "S",
            FieldType::Number => "N",
            FieldType::Binary => "B",
        }
    }

    /// Parses a DynamoDB type code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(FieldType::String),
            "N" => Some(FieldType::Number),
            "B" => Some(FieldType::Binary),
            _ => None,
        }
    }
}

/// Role of an attribute in the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// Partition key (`HASH`).
    Partition,
    /// Sort key (`RANGE`).
    Sort,
}

impl KeyRole {
    pub fn code(&self) -> &'static str {
        match self {
            KeyRole::Partition => "HASH",
            KeyRole::Sort => "RANGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub name: String,
    pub field_type: FieldType,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyElement {
    pub name: String,
    pub role: KeyRole,
}

impl KeyElement {
    pub fn new(name: impl Into<String>, role: KeyRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Attribute definitions and key schema of a table, in the order DynamoDB
/// reports them.
///
/// This is exactly what gets cloned onto the destination table. Secondary
/// indexes are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    attributes: Vec<AttributeDefinition>,
    key_schema: Vec<KeyElement>,
}

impl TableSchema {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from already ordered parts.
    pub fn from_parts(attributes: Vec<AttributeDefinition>, key_schema: Vec<KeyElement>) -> Self {
        Self {
            attributes,
            key_schema,
        }
    }

    /// Adds the partition key and its attribute definition.
    #[cfg(test)]
    pub fn with_partition_key(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_key(name.into(), field_type, KeyRole::Partition)
    }

    /// Adds the sort key and its attribute definition.
    #[cfg(test)]
    pub fn with_sort_key(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_key(name.into(), field_type, KeyRole::Sort)
    }

    #[cfg(test)]
    fn with_key(mut self, name: String, field_type: FieldType, role: KeyRole) -> Self {
        self.attributes
            .push(AttributeDefinition::new(name.clone(), field_type));
        self.key_schema.push(KeyElement::new(name, role));
        self
    }

    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    pub fn key_schema(&self) -> &[KeyElement] {
        &self.key_schema
    }

    /// Names of the primary key attributes.
    #[cfg(test)]
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.key_schema.iter().map(|k| k.name.as_str())
    }
}

/// Provisioned throughput of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub read_units: i64,
    pub write_units: i64,
}

impl Capacity {
    pub const fn new(read_units: i64, write_units: i64) -> Self {
        Self {
            read_units,
            write_units,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(Read), {}(Write)", self.read_units, self.write_units)
    }
}

/// Lifecycle state of a table as reported by `DescribeTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    /// Archived, inaccessible-encryption and anything newer the SDK adds.
    Other,
}

/// Snapshot of a live table, recreated on every describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub schema: TableSchema,
    pub capacity: Capacity,
    pub status: TableStatus,
}

impl TableDescriptor {
    pub fn is_active(&self) -> bool {
        self.status == TableStatus::Active
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes = self
            .schema
            .attributes()
            .iter()
            .map(|a| format!("{}({})", a.name, a.field_type.code()))
            .collect::<Vec<_>>()
            .join(",");
        let keys = self
            .schema
            .key_schema()
            .iter()
            .map(|k| format!("{}({})", k.name, k.role.code()))
            .collect::<Vec<_>>()
            .join(",");

        writeln!(f, "Table Name: {}", self.name)?;
        writeln!(f, "Table Attributes: {attributes}")?;
        writeln!(f, "Table Key Schema: {keys}")?;
        write!(f, "Table Capacity: {}", self.capacity)
    }
}
