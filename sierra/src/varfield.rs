//! Sierra variable-length field model.
//!
//! Sierra exposes bib and item data as a list of "varFields".  Each
//! varField carries a single character Sierra field tag, an optional
//! MARC tag and indicators, and either a list of subfields or a single
//! unstructured content string.
use crate::result::{SierraError, SierraResult};
use json::JsonValue;

const FIELD_TAG_SIZE: usize = 1;
const MARC_TAG_SIZE: usize = 3;
const CODE_SIZE: usize = 1;
const DEFAULT_INDICATOR: &str = " ";

/// Verifies the provided string is composed of 'len' number of bytes.
fn check_byte_count(s: &str, len: usize) -> SierraResult<()> {
    let byte_len = s.len();
    if byte_len != len {
        return Err(SierraError::invalid(format!(
            "Invalid byte count for string s={s} wanted={len} found={byte_len}"
        )));
    }
    Ok(())
}

/// A single subfield code + value pair
#[derive(Debug, Clone, PartialEq)]
pub struct Subfield {
    code: String,
    content: String,
}

impl Subfield {
    /// Create a Subfield with the provided code and content.
    ///
    /// * `code` - Must have the correct byte count.
    ///
    /// # Examples
    ///
    /// ```
    /// use sierra::varfield::Subfield;
    ///
    /// let sf = Subfield::new("h", "ML100").unwrap();
    /// assert_eq!(sf.code(), "h");
    /// assert_eq!(sf.content(), "ML100");
    ///
    /// assert!(Subfield::new("hh", "ML100").is_err());
    /// ```
    pub fn new(code: impl Into<String>, content: impl Into<String>) -> SierraResult<Self> {
        let code = code.into();
        check_byte_count(&code, CODE_SIZE)?;
        Ok(Subfield {
            code,
            content: content.into(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Sierra represents a subfield as {"tag": "a", "content": "..."}
    pub fn from_json_value(value: &JsonValue) -> SierraResult<Self> {
        let code = value["tag"]
            .as_str()
            .ok_or_else(|| SierraError::invalid(format!("Subfield has no tag: {value}")))?;

        let content = value["content"]
            .as_str()
            .ok_or_else(|| SierraError::invalid(format!("Subfield has no content: {value}")))?;

        Subfield::new(code, content)
    }

    pub fn to_json_value(&self) -> JsonValue {
        json::object! {
            "tag": self.code.as_str(),
            "content": self.content.as_str()
        }
    }
}

/// A varField holds either subfields or a plain content string,
/// never both.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldBody {
    Subfields(Vec<Subfield>),
    Content(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarField {
    field_tag: String,
    marc_tag: Option<String>,
    ind1: Option<String>,
    ind2: Option<String>,
    body: FieldBody,
}

impl VarField {
    /// Create a subfield-bearing field with the provided tags and
    /// no subfields.
    ///
    /// # Examples
    ///
    /// ```
    /// use sierra::varfield::VarField;
    ///
    /// let field = VarField::new("c", "852").unwrap();
    /// assert_eq!(field.field_tag(), "c");
    /// assert_eq!(field.marc_tag(), Some("852"));
    /// assert_eq!(field.ind1(), " ");
    /// assert!(field.subfields().is_empty());
    ///
    /// assert!(VarField::new("cc", "852").is_err());
    /// assert!(VarField::new("c", "85").is_err());
    /// ```
    pub fn new(field_tag: impl Into<String>, marc_tag: impl Into<String>) -> SierraResult<Self> {
        let field_tag = field_tag.into();
        let marc_tag = marc_tag.into();

        check_byte_count(&field_tag, FIELD_TAG_SIZE)?;
        check_byte_count(&marc_tag, MARC_TAG_SIZE)?;

        Ok(VarField {
            field_tag,
            marc_tag: Some(marc_tag),
            ind1: None,
            ind2: None,
            body: FieldBody::Subfields(Vec::new()),
        })
    }

    /// Create a content-bearing field which has no MARC tag, e.g. an
    /// item barcode or an internal note.
    ///
    /// ```
    /// use sierra::varfield::VarField;
    ///
    /// let note = VarField::new_content("x", "Hello").unwrap();
    /// assert_eq!(note.content(), Some("Hello"));
    /// assert_eq!(note.marc_tag(), None);
    /// ```
    pub fn new_content(
        field_tag: impl Into<String>,
        content: impl Into<String>,
    ) -> SierraResult<Self> {
        let field_tag = field_tag.into();
        check_byte_count(&field_tag, FIELD_TAG_SIZE)?;

        Ok(VarField {
            field_tag,
            marc_tag: None,
            ind1: None,
            ind2: None,
            body: FieldBody::Content(content.into()),
        })
    }

    pub fn field_tag(&self) -> &str {
        &self.field_tag
    }

    pub fn marc_tag(&self) -> Option<&str> {
        self.marc_tag.as_deref()
    }

    /// Get the value of indicator-1, defaulting to DEFAULT_INDICATOR.
    pub fn ind1(&self) -> &str {
        self.ind1.as_deref().unwrap_or(DEFAULT_INDICATOR)
    }

    /// Get the value of indicator-2, defaulting to DEFAULT_INDICATOR.
    pub fn ind2(&self) -> &str {
        self.ind2.as_deref().unwrap_or(DEFAULT_INDICATOR)
    }

    /// Set the indicator-1 value.
    ///
    /// * `ind` - Must have the correct byte count.
    pub fn set_ind1(&mut self, ind: impl Into<String>) -> SierraResult<()> {
        let ind = ind.into();
        check_byte_count(&ind, CODE_SIZE)?;
        self.ind1 = Some(ind);
        Ok(())
    }

    /// Set the indicator-2 value.
    ///
    /// * `ind` - Must have the correct byte count.
    pub fn set_ind2(&mut self, ind: impl Into<String>) -> SierraResult<()> {
        let ind = ind.into();
        check_byte_count(&ind, CODE_SIZE)?;
        self.ind2 = Some(ind);
        Ok(())
    }

    /// Get the full list of subfields.
    ///
    /// Content-bearing fields have no subfields.
    pub fn subfields(&self) -> &[Subfield] {
        match self.body {
            FieldBody::Subfields(ref list) => list,
            FieldBody::Content(_) => &[],
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self.body {
            FieldBody::Content(ref c) => Some(c),
            FieldBody::Subfields(_) => None,
        }
    }

    /// Adds a new Subfield to this field using the provided code and
    /// content.
    ///
    /// Returns Err if this is a content-bearing field.
    ///
    /// ```
    /// use sierra::varfield::VarField;
    ///
    /// let mut field = VarField::new("q", "852").unwrap();
    /// field.add_subfield("h", "ML100").unwrap();
    /// field.add_subfield("i", ".G13 2019").unwrap();
    /// assert_eq!(field.subfields().len(), 2);
    ///
    /// let mut note = VarField::new_content("x", "Hello").unwrap();
    /// assert!(note.add_subfield("a", "Nope").is_err());
    /// ```
    pub fn add_subfield(
        &mut self,
        code: impl Into<String>,
        content: impl Into<String>,
    ) -> SierraResult<()> {
        let sf = Subfield::new(code, content)?;
        match self.body {
            FieldBody::Subfields(ref mut list) => {
                list.push(sf);
                Ok(())
            }
            FieldBody::Content(_) => Err(SierraError::invalid(format!(
                "Cannot add subfields to content field {}",
                self.field_tag
            ))),
        }
    }

    /// Build a VarField from a Sierra API varField object.
    ///
    /// ```
    /// use sierra::varfield::VarField;
    ///
    /// let value = json::object! {
    ///     "fieldTag": "c",
    ///     "marcTag": "852",
    ///     "ind1": "8",
    ///     "ind2": " ",
    ///     "subfields": [{"tag": "h", "content": "FOO, BAR"}]
    /// };
    ///
    /// let field = VarField::from_json_value(&value).unwrap();
    /// assert_eq!(field.ind1(), "8");
    /// assert_eq!(field.subfields()[0].content(), "FOO, BAR");
    /// assert_eq!(field.to_json_value(), value);
    /// ```
    pub fn from_json_value(value: &JsonValue) -> SierraResult<Self> {
        if !value.is_object() {
            return Err(SierraError::invalid(format!(
                "varField is not an object: {value}"
            )));
        }

        let field_tag = value["fieldTag"]
            .as_str()
            .ok_or_else(|| SierraError::invalid(format!("varField has no fieldTag: {value}")))?;
        check_byte_count(field_tag, FIELD_TAG_SIZE)?;

        let marc_tag = match value["marcTag"].as_str() {
            Some(t) => {
                check_byte_count(t, MARC_TAG_SIZE)?;
                Some(t.to_string())
            }
            None => None,
        };

        let has_subfields = !value["subfields"].is_null();
        let has_content = !value["content"].is_null();

        let body = match (has_subfields, has_content) {
            (true, false) => {
                if !value["subfields"].is_array() {
                    return Err(SierraError::invalid(format!(
                        "varField subfields must be a list: {value}"
                    )));
                }
                let mut list = Vec::new();
                for sf in value["subfields"].members() {
                    list.push(Subfield::from_json_value(sf)?);
                }
                FieldBody::Subfields(list)
            }
            (false, true) => {
                let content = value["content"].as_str().ok_or_else(|| {
                    SierraError::invalid(format!("varField content must be a string: {value}"))
                })?;
                FieldBody::Content(content.to_string())
            }
            _ => {
                return Err(SierraError::invalid(format!(
                    "varField requires exactly one of subfields or content: {value}"
                )))
            }
        };

        let mut field = VarField {
            field_tag: field_tag.to_string(),
            marc_tag,
            ind1: None,
            ind2: None,
            body,
        };

        if let Some(ind) = value["ind1"].as_str() {
            field.set_ind1(ind)?;
        }

        if let Some(ind) = value["ind2"].as_str() {
            field.set_ind2(ind)?;
        }

        Ok(field)
    }

    /// Translate to the Sierra API shape.
    ///
    /// Keys which were absent on input stay absent on output.
    pub fn to_json_value(&self) -> JsonValue {
        let mut obj = json::object! { "fieldTag": self.field_tag.as_str() };

        if let Some(ref tag) = self.marc_tag {
            obj["marcTag"] = tag.as_str().into();
        }
        if let Some(ref ind) = self.ind1 {
            obj["ind1"] = ind.as_str().into();
        }
        if let Some(ref ind) = self.ind2 {
            obj["ind2"] = ind.as_str().into();
        }

        match self.body {
            FieldBody::Subfields(ref list) => {
                let subfields: Vec<JsonValue> = list.iter().map(|sf| sf.to_json_value()).collect();
                obj["subfields"] = JsonValue::Array(subfields);
            }
            FieldBody::Content(ref c) => {
                obj["content"] = c.as_str().into();
            }
        }

        obj
    }
}

/// Parse a list of varField objects.
pub fn var_fields_from_json(value: &JsonValue) -> SierraResult<Vec<VarField>> {
    if value.is_null() {
        return Ok(Vec::new());
    }

    if !value.is_array() {
        return Err(SierraError::invalid(format!(
            "varFields must be a list: {value}"
        )));
    }

    value.members().map(VarField::from_json_value).collect()
}

/// Wrap a list of fields in the update body Sierra expects:
/// {"varFields": [...]}
pub fn var_fields_update_body(fields: &[VarField]) -> JsonValue {
    let list: Vec<JsonValue> = fields.iter().map(|f| f.to_json_value()).collect();
    json::object! { "varFields": JsonValue::Array(list) }
}
