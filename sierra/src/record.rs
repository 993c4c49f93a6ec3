//! Bib and item records as returned by the Sierra REST API.
use crate::result::{SierraError, SierraResult};
use crate::util;
use crate::varfield::{self, VarField};
use json::JsonValue;

/// A bibliographic record and links to its attached items.
#[derive(Debug, Clone, PartialEq)]
pub struct Bib {
    id: String,
    var_fields: Vec<VarField>,
    item_links: Vec<String>,
}

impl Bib {
    pub fn new(id: impl Into<String>, var_fields: Vec<VarField>, item_links: Vec<String>) -> Self {
        Bib {
            id: id.into(),
            var_fields,
            item_links,
        }
    }

    /// Build a Bib from a bib read response requested with
    /// fields=varFields,items.
    ///
    /// The response does not always echo the ID back, so the caller
    /// provides the ID it asked for.
    pub fn from_json_value(bib_id: &str, value: &JsonValue) -> SierraResult<Self> {
        let var_fields = varfield::var_fields_from_json(&value["varFields"])?;

        let mut item_links = Vec::new();
        for link in value["items"].members() {
            let link = link
                .as_str()
                .ok_or_else(|| SierraError::invalid(format!("Invalid item link: {link}")))?;
            item_links.push(link.to_string());
        }

        Ok(Bib::new(bib_id, var_fields, item_links))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn var_fields(&self) -> &[VarField] {
        &self.var_fields
    }

    /// Item IDs extracted from the item links, in link order.
    ///
    /// ```
    /// use sierra::record::Bib;
    ///
    /// let bib = Bib::new(
    ///     "1000001",
    ///     vec![],
    ///     vec!["https://example.org/iii/sierra-api/v6/items/14381985".to_string()],
    /// );
    ///
    /// assert_eq!(bib.item_ids(), vec!["14381985"]);
    /// ```
    pub fn item_ids(&self) -> Vec<String> {
        self.item_links
            .iter()
            .map(|l| util::item_id_from_link(l))
            .collect()
    }
}

/// A physical holding attached to a bib record.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: String,
    location_code: Option<String>,
    var_fields: Vec<VarField>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        location_code: Option<&str>,
        var_fields: Vec<VarField>,
    ) -> Self {
        Item {
            id: id.into(),
            location_code: location_code.map(|c| c.to_string()),
            var_fields,
        }
    }

    /// Build an Item from one entry of an item read response requested
    /// with fields=location,varFields.
    pub fn from_json_value(value: &JsonValue) -> SierraResult<Self> {
        let id = util::json_string(&value["id"])?;
        let location_code = value["location"]["code"].as_str();
        let var_fields = varfield::var_fields_from_json(&value["varFields"])?;

        Ok(Item::new(id, location_code, var_fields))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location_code(&self) -> Option<&str> {
        self.location_code.as_deref()
    }

    pub fn var_fields(&self) -> &[VarField] {
        &self.var_fields
    }
}
