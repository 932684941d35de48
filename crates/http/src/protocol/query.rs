use tracing::debug;

/// Percent decoded query parameters in the order they appeared.
///
/// A key without `=` maps to an empty value; repeated keys are all kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    /// The first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    /// Every value of `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.params.iter().filter(move |(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|(name, _)| name == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<&str> for Query {
    // a=1&c=2&b=3
    // a=1&a=2
    // a&b&c=2
    // name=J%C3%BCrgen+K
    fn from(query: &str) -> Self {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(params) => Self { params },
            Err(e) => {
                debug!(query, cause = %e, "ignore undecodable query");
                Self::default()
            }
        }
    }
}
