// SWAPI catalog types.
// Categories, record addresses, records and pages, parsed strictly from JSON.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{CatalogError, Result};

use super::schema::{self, FieldKind};

/// Records per page, fixed by the service.
pub const PAGE_SIZE: u64 = 10;

/// One of the six fixed record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Category {
    #[default]
    People,
    Planets,
    Films,
    Species,
    Vehicles,
    Starships,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::People,
        Category::Planets,
        Category::Films,
        Category::Species,
        Category::Vehicles,
        Category::Starships,
    ];

    /// Path segment used by the service.
    pub fn path(&self) -> &'static str {
        match self {
            Category::People => "people",
            Category::Planets => "planets",
            Category::Films => "films",
            Category::Species => "species",
            Category::Vehicles => "vehicles",
            Category::Starships => "starships",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Category::People => "People",
            Category::Planets => "Planets",
            Category::Films => "Films",
            Category::Species => "Species",
            Category::Vehicles => "Vehicles",
            Category::Starships => "Starships",
        }
    }

    /// Field holding the display name. Films are titled, everything else is named.
    pub fn name_field(&self) -> &'static str {
        match self {
            Category::Films => "title",
            _ => "name",
        }
    }

    pub fn from_path(segment: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.path() == segment)
    }

    pub fn next(&self) -> Self {
        let index = Category::ALL.iter().position(|c| c == self).unwrap_or(0);
        Category::ALL[(index + 1) % Category::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        let index = Category::ALL.iter().position(|c| c == self).unwrap_or(0);
        Category::ALL[(index + Category::ALL.len() - 1) % Category::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Category::from_path(s).ok_or_else(|| CatalogError::InvalidAddress(s.to_string()))
    }
}

/// Stable locator of a record, doubling as its cross-reference target.
///
/// Kept verbatim: two addresses are the same record only if the strings match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(CatalogError::InvalidAddress(raw.to_string()));
        }
        url::Url::parse(raw).map_err(|_| CatalogError::InvalidAddress(raw.to_string()))?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last non-empty path segment (`"1"` for `.../people/1/`).
    pub fn id(&self) -> Option<&str> {
        self.segments().next()
    }

    /// Category named by the segment before the id.
    pub fn category(&self) -> Option<Category> {
        self.segments().nth(1).and_then(Category::from_path)
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        let path = self
            .0
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.0);
        let path = path.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One item within a category. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    category: Category,
    address: Address,
    display_name: String,
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a service object, rejecting anything that does not
    /// match the category's schema.
    pub fn from_json(category: Category, value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(malformed(format!("{} record is not an object", category)));
        };

        let address = match fields.get("url") {
            Some(Value::String(url)) => Address::parse(url)
                .map_err(|_| malformed(format!("record url {:?} is not an address", url)))?,
            _ => return Err(malformed(format!("{} record has no `url`", category))),
        };

        let display_name = match fields.get(category.name_field()) {
            Some(Value::String(name)) => name.clone(),
            _ => {
                return Err(malformed(format!(
                    "{} has no `{}`",
                    address,
                    category.name_field()
                )));
            }
        };

        for (key, value) in &fields {
            match schema::classify(category, key) {
                FieldKind::Reference => match value {
                    Value::Null => {}
                    Value::String(s) => {
                        Address::parse(s).map_err(|_| bad_reference(&address, key))?;
                    }
                    _ => return Err(bad_reference(&address, key)),
                },
                FieldKind::References => {
                    let Value::Array(items) = value else {
                        return Err(bad_reference(&address, key));
                    };
                    for item in items {
                        let Value::String(s) = item else {
                            return Err(bad_reference(&address, key));
                        };
                        Address::parse(s).map_err(|_| bad_reference(&address, key))?;
                    }
                }
                FieldKind::Suppressed | FieldKind::Scalar => {}
            }
        }

        Ok(Self {
            category,
            address,
            display_name,
            fields,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Every address held by a reference field, first occurrence order.
    pub fn references(&self) -> Vec<Address> {
        let mut out: Vec<Address> = Vec::new();
        for (key, value) in &self.fields {
            let raw: Vec<&str> = match (schema::classify(self.category, key), value) {
                (FieldKind::Reference, Value::String(s)) => vec![s.as_str()],
                (FieldKind::References, Value::Array(items)) => {
                    items.iter().filter_map(Value::as_str).collect()
                }
                _ => continue,
            };
            for s in raw {
                if let Ok(address) = Address::parse(s) {
                    if !out.contains(&address) {
                        out.push(address);
                    }
                }
            }
        }
        out
    }
}

/// One fetched slice of a category's record list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub category: Category,
    pub number: u32,
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Arc<Record>>,
}

impl Page {
    /// Parse a `{count, next, previous, results}` envelope. All four keys are required.
    pub fn from_json(category: Category, number: u32, value: Value) -> Result<Self> {
        let Value::Object(mut envelope) = value else {
            return Err(malformed(format!("{} page is not an object", category)));
        };

        let count = envelope
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed(format!("{} page {} has no `count`", category, number)))?;
        let next = link(&envelope, "next", category, number)?;
        let previous = link(&envelope, "previous", category, number)?;

        let results = match envelope.remove("results") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| Record::from_json(category, item).map(Arc::new))
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(malformed(format!(
                    "{} page {} has no `results`",
                    category, number
                )));
            }
        };

        Ok(Self {
            category,
            number,
            count,
            next,
            previous,
            results,
        })
    }

    pub fn total_pages(&self) -> u64 {
        self.count.div_ceil(PAGE_SIZE)
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

fn link(envelope: &Map<String, Value>, key: &str, category: Category, number: u32) -> Result<Option<String>> {
    match envelope.get(key) {
        Some(Value::Null) => Ok(None),
        Some(Value::String(url)) => Ok(Some(url.clone())),
        _ => Err(malformed(format!(
            "{} page {} has no `{}` link",
            category, number, key
        ))),
    }
}

fn malformed(message: String) -> CatalogError {
    CatalogError::MalformedResponse(message)
}

fn bad_reference(address: &Address, key: &str) -> CatalogError {
    malformed(format!("{}: field `{}` does not hold addresses", address, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn luke() -> Value {
        json!({
            "name": "Luke Skywalker",
            "height": "172",
            "birth_year": "19BBY",
            "gender": "male",
            "homeworld": "https://swapi.py4e.com/api/planets/1/",
            "films": [
                "https://swapi.py4e.com/api/films/1/",
                "https://swapi.py4e.com/api/films/2/"
            ],
            "species": [],
            "created": "2014-12-09T13:50:51.644000Z",
            "edited": "2014-12-20T21:17:56.891000Z",
            "url": "https://swapi.py4e.com/api/people/1/"
        })
    }

    #[test]
    fn test_category_cycle() {
        assert_eq!(Category::People.next(), Category::Planets);
        assert_eq!(Category::Starships.next(), Category::People);
        assert_eq!(Category::People.prev(), Category::Starships);
        assert_eq!("films".parse::<Category>().unwrap(), Category::Films);
        assert!("droids".parse::<Category>().is_err());
    }

    #[test]
    fn test_address_parts() {
        let address = Address::parse("https://swapi.py4e.com/api/planets/12/").unwrap();
        assert_eq!(address.id(), Some("12"));
        assert_eq!(address.category(), Some(Category::Planets));

        let no_slash = Address::parse("https://swapi.py4e.com/api/films/3").unwrap();
        assert_eq!(no_slash.id(), Some("3"));
        assert_eq!(no_slash.category(), Some(Category::Films));
    }

    #[test]
    fn test_empty_address_invalid() {
        assert!(matches!(
            Address::parse(""),
            Err(CatalogError::InvalidAddress(_))
        ));
        assert!(Address::parse("   ").is_err());
        assert!(Address::parse("people/1").is_err());
    }

    #[test]
    fn test_record_from_json() {
        let record = Record::from_json(Category::People, luke()).unwrap();
        assert_eq!(record.display_name(), "Luke Skywalker");
        assert_eq!(record.address().id(), Some("1"));
        assert_eq!(record.references().len(), 3);
        assert_eq!(
            record.references()[0].as_str(),
            "https://swapi.py4e.com/api/planets/1/"
        );
    }

    #[test]
    fn test_film_display_name_is_title() {
        let film = json!({
            "title": "A New Hope",
            "episode_id": 4,
            "director": "George Lucas",
            "url": "https://swapi.py4e.com/api/films/1/"
        });
        let record = Record::from_json(Category::Films, film).unwrap();
        assert_eq!(record.display_name(), "A New Hope");
    }

    #[test]
    fn test_record_missing_fields_rejected() {
        let mut no_url = luke();
        no_url.as_object_mut().unwrap().remove("url");
        assert!(matches!(
            Record::from_json(Category::People, no_url),
            Err(CatalogError::MalformedResponse(_))
        ));

        // A film is titled, so a `name` alone is not enough.
        let named_film = json!({ "name": "A New Hope", "url": "https://swapi.py4e.com/api/films/1/" });
        assert!(Record::from_json(Category::Films, named_film).is_err());
    }

    #[test]
    fn test_record_bad_reference_rejected() {
        let mut bad = luke();
        bad["films"] = json!("https://swapi.py4e.com/api/films/1/");
        assert!(matches!(
            Record::from_json(Category::People, bad),
            Err(CatalogError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_species_homeworld_may_be_null() {
        let droid = json!({
            "name": "Droid",
            "classification": "artificial",
            "homeworld": null,
            "people": ["https://swapi.py4e.com/api/people/2/"],
            "url": "https://swapi.py4e.com/api/species/2/"
        });
        let record = Record::from_json(Category::Species, droid).unwrap();
        assert_eq!(record.references().len(), 1);
    }

    #[test]
    fn test_single_page_of_films() {
        let body = json!({
            "count": 6,
            "next": null,
            "previous": null,
            "results": [{ "title": "A New Hope", "url": "https://swapi.py4e.com/api/films/1/" }]
        });
        let page = Page::from_json(Category::Films, 1, body).unwrap();
        assert_eq!(page.total_pages(), 1);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn test_page_requires_links() {
        let body = json!({ "count": 82, "results": [] });
        assert!(matches!(
            Page::from_json(Category::People, 1, body),
            Err(CatalogError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let body = json!({
            "count": 82,
            "next": "https://swapi.py4e.com/api/people/?page=2",
            "previous": null,
            "results": []
        });
        let page = Page::from_json(Category::People, 1, body).unwrap();
        assert_eq!(page.total_pages(), 9);
        assert!(page.has_next());
    }
}
