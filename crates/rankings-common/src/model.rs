use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::layout::{KeyLayout, ObjectReader, ObjectWriter};

/// The canonical rankings document: categories in display order.
///
/// Serialized as a bare JSON array of categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingDocument {
    pub categories: Vec<Category>,
}

impl RankingDocument {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.name == name)
    }

    /// Total number of entries in all ranked lists (champions excluded).
    pub fn fighter_count(&self) -> usize {
        self.categories.iter().map(|c| c.fighters.len()).sum()
    }
}

/// A weight class or special list (e.g. pound-for-pound).
///
/// Stored under the JSON key `category`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    /// Display name, e.g. "Flyweight" or "Men's Pound-for-Pound Top Rank"
    pub name: String,
    /// Title holder, stored apart from the ranked list
    pub champion: Option<Fighter>,
    /// Ranked fighters, rank 1 first
    pub fighters: Vec<Fighter>,
    /// Keys this tool does not know about, kept verbatim
    pub extra: Map<String, Value>,
    /// Key order and explicit nulls as read
    pub layout: KeyLayout,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut reader = ObjectReader::new(map);
        let name = reader.required("category")?;
        let champion = reader.optional("champion")?;
        let fighters: Vec<Fighter> = reader.optional("fighters")?.unwrap_or_default();
        let (extra, layout) = reader.finish();
        Ok(Self {
            name,
            champion,
            fighters,
            extra,
            layout,
        })
    }

    fn to_map(&self) -> Map<String, Value> {
        ObjectWriter::new(&self.extra, &self.layout)
            .string("category", Some(self.name.as_str()))
            .field("champion", self.champion.as_ref().map(|c| Value::Object(c.to_map())))
            .field(
                "fighters",
                Some(Value::Array(
                    self.fighters.iter().map(|f| Value::Object(f.to_map())).collect(),
                )),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fighter {
    /// Rank label as shown on the source page, e.g. "1" or "3 (T)"
    pub rank: Option<String>,
    /// Display name; the join key across update sources
    pub name: String,
    /// Headshot URL or path
    pub image: Option<String>,
    /// Athlete profile URL
    pub link: Option<String>,
    pub details: Option<FighterDetails>,
    pub extra: Map<String, Value>,
    pub layout: KeyLayout,
}

impl Fighter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Absent, `null` and empty-string images are treated alike.
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn image_str(&self) -> &str {
        self.image.as_deref().unwrap_or("")
    }

    pub fn link_str(&self) -> &str {
        self.link.as_deref().unwrap_or("")
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut reader = ObjectReader::new(map);
        let rank = reader.optional("rank")?;
        let name = reader.required("name")?;
        let image = reader.optional("image")?;
        let link = reader.optional("link")?;
        let details = reader.optional("details")?;
        let (extra, layout) = reader.finish();
        Ok(Self {
            rank,
            name,
            image,
            link,
            details,
            extra,
            layout,
        })
    }

    fn to_map(&self) -> Map<String, Value> {
        ObjectWriter::new(&self.extra, &self.layout)
            .string("rank", self.rank.as_deref())
            .string("name", Some(self.name.as_str()))
            .string("image", self.image.as_deref())
            .string("link", self.link.as_deref())
            .field("details", self.details.as_ref().map(|d| Value::Object(d.to_map())))
            .finish()
    }
}

/// Curated bio fields. All values are free-form strings copied from the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FighterDetails {
    pub record: Option<String>,
    pub age: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub reach: Option<String>,
    pub leg_reach: Option<String>,
    pub octagon_debut: Option<String>,
    pub extra: Map<String, Value>,
    pub layout: KeyLayout,
}

impl FighterDetails {
    fn from_map(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut reader = ObjectReader::new(map);
        let record = reader.optional("record")?;
        let age = reader.optional("age")?;
        let height = reader.optional("height")?;
        let weight = reader.optional("weight")?;
        let reach = reader.optional("reach")?;
        let leg_reach = reader.optional("leg_reach")?;
        let octagon_debut = reader.optional("octagon_debut")?;
        let (extra, layout) = reader.finish();
        Ok(Self {
            record,
            age,
            height,
            weight,
            reach,
            leg_reach,
            octagon_debut,
            extra,
            layout,
        })
    }

    fn to_map(&self) -> Map<String, Value> {
        ObjectWriter::new(&self.extra, &self.layout)
            .string("record", self.record.as_deref())
            .string("age", self.age.as_deref())
            .string("height", self.height.as_deref())
            .string("weight", self.weight.as_deref())
            .string("reach", self.reach.as_deref())
            .string("leg_reach", self.leg_reach.as_deref())
            .string("octagon_debut", self.octagon_debut.as_deref())
            .finish()
    }
}

macro_rules! object_serde {
    ($($ty:ty),*) => {$(
        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.to_map().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let map = Map::<String, Value>::deserialize(deserializer)?;
                Self::from_map(map).map_err(D::Error::custom)
            }
        }
    )*};
}

object_serde!(Category, Fighter, FighterDetails);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_document_keeps_unknown_keys() {
        let json = r#"[
          {
            "category": "플라이급",
            "champion": { "name": "Alexandre Pantoja", "image": "/images/a.png" },
            "fighters": [
              { "rank": "1", "name": "Brandon Royval", "nickname": "Raw Dawg" }
            ],
            "updated_at": "2025-10-01"
          }
        ]"#;

        let doc: RankingDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.categories.len(), 1);
        let cat = &doc.categories[0];
        assert_eq!(cat.name, "플라이급");
        assert_eq!(cat.champion.as_ref().unwrap().image_str(), "/images/a.png");
        assert_eq!(cat.fighters[0].extra["nickname"], "Raw Dawg");
        assert_eq!(cat.extra["updated_at"], "2025-10-01");

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back[0]["fighters"][0]["nickname"], "Raw Dawg");
        assert_eq!(back[0]["updated_at"], "2025-10-01");
    }

    #[test]
    fn absent_fields_are_not_invented() {
        let json = r#"[{"category": "Lightweight", "fighters": [{"rank": "1", "name": "Arman Tsarukyan"}]}]"#;
        let doc: RankingDocument = serde_json::from_str(json).unwrap();
        assert!(doc.categories[0].champion.is_none());

        let out = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            out,
            r#"[{"category":"Lightweight","fighters":[{"rank":"1","name":"Arman Tsarukyan"}]}]"#
        );
    }

    #[test]
    fn empty_image_counts_as_missing() {
        let mut f = Fighter::new("Petr Yan");
        assert!(!f.has_image());
        f.image = Some(String::new());
        assert!(!f.has_image());
        f.image = Some("https://example.com/yan.png".into());
        assert!(f.has_image());
    }

    #[test]
    fn null_values_survive_a_rewrite() {
        let json = r#"[{"category":"Vacant","champion":null,"fighters":[{"rank":"1","name":"Ilia Topuria","image":null,"details":null}]}]"#;
        let mut doc: RankingDocument = serde_json::from_str(json).unwrap();
        assert!(doc.categories[0].champion.is_none());
        assert!(!doc.categories[0].fighters[0].has_image());
        assert_eq!(serde_json::to_string(&doc).unwrap(), json);

        doc.categories[0].fighters[0].image = Some("/images/topuria.png".into());
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"[{"category":"Vacant","champion":null,"fighters":[{"rank":"1","name":"Ilia Topuria","image":"/images/topuria.png","details":null}]}]"#
        );
    }

    #[test]
    fn key_order_is_kept_with_unknown_keys_interleaved() {
        let json = r#"[{"fighters":[{"name":"Merab Dvalishvili","nickname":"The Machine","rank":"C","image":""}],"category":"Bantamweight","champion":{"name":"Merab Dvalishvili"}}]"#;
        let mut doc: RankingDocument = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), json);

        let fighter = &mut doc.categories[0].fighters[0];
        fighter.image = Some("/images/merab.png".into());
        fighter.link = Some("/athlete/merab-dvalishvili".into());
        assert_eq!(
            serde_json::to_string(&doc.categories[0].fighters[0]).unwrap(),
            r#"{"name":"Merab Dvalishvili","nickname":"The Machine","rank":"C","image":"/images/merab.png","link":"/athlete/merab-dvalishvili"}"#
        );
    }

    #[test]
    fn fighter_without_name_is_rejected() {
        let err = serde_json::from_str::<Fighter>(r#"{"rank":"1"}"#).unwrap_err();
        assert!(err.to_string().contains("name"));
    }
}
