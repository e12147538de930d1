use std::fmt;
use std::marker::PhantomData;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use crate::vars::Scalar;

/// One vulnerability check: its variable schema and the rules proving it.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawDefinition")]
pub struct Definition {
    pub name: String,
    /// Ordered `name -> default expression` schema for the expression environment.
    pub set: Vec<(String, String)>,
    pub rules: RuleSet,
    pub detail: Detail,
}

#[derive(Debug, Clone)]
pub enum RuleSet {
    /// All rules must verify, in order.
    Chain(Vec<Rule>),
    /// Any one group verifying is enough.
    Groups(Vec<RuleGroup>),
}

#[derive(Debug, Clone)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Detail {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

/// One request + verification step.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub headers: Vec<(String, String)>,
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub expression: String,
    /// Bindings merged into the variable set before the step runs.
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub set: Vec<(String, Scalar)>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_follow_redirects() -> bool {
    true
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            method: default_method(),
            path: String::new(),
            body: String::new(),
            headers: Vec::new(),
            follow_redirects: default_follow_redirects(),
            search: None,
            expression: String::new(),
            set: Vec::new(),
        }
    }
}

impl Rule {
    pub fn get(path: &str) -> Self {
        Self { path: path.to_string(), ..Default::default() }
    }

    pub fn post(path: &str, body: &str) -> Self {
        Self {
            method: "POST".to_string(),
            path: path.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn with_expression(mut self, expression: &str) -> Self {
        self.expression = expression.to_string();
        self
    }

    pub fn with_search(mut self, pattern: &str) -> Self {
        self.search = Some(pattern.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_binding(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.set.push((name.to_string(), value.into()));
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// The trimmed search pattern, if one is set and non-blank.
    pub fn search_pattern(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

#[derive(Deserialize)]
struct RawDefinition {
    name: String,
    #[serde(default, deserialize_with = "ordered_pairs")]
    set: Vec<(String, String)>,
    #[serde(default)]
    rules: Option<Vec<Rule>>,
    #[serde(default, deserialize_with = "optional_ordered_pairs")]
    groups: Option<Vec<(String, Vec<Rule>)>>,
    #[serde(default)]
    detail: Detail,
}

impl TryFrom<RawDefinition> for Definition {
    type Error = String;

    fn try_from(raw: RawDefinition) -> Result<Self, Self::Error> {
        let rules = match (raw.rules, raw.groups) {
            (Some(rules), None) => RuleSet::Chain(rules),
            (None, Some(groups)) => RuleSet::Groups(
                groups.into_iter().map(|(name, rules)| RuleGroup { name, rules }).collect(),
            ),
            (Some(_), Some(_)) => return Err(format!("'{}' declares both rules and groups", raw.name)),
            (None, None) => return Err(format!("'{}' declares neither rules nor groups", raw.name)),
        };
        Ok(Self { name: raw.name, set: raw.set, rules, detail: raw.detail })
    }
}

/// Deserialize a mapping keeping its document order.
fn ordered_pairs<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct PairsVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                pairs.push((key, value));
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_any(PairsVisitor(PhantomData))
}

fn optional_ordered_pairs<'de, D, V>(deserializer: D) -> Result<Option<Vec<(String, V)>>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    ordered_pairs(deserializer).map(Some)
}
