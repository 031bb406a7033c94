use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RESULTS: u32 = 100;
pub const DEFAULT_SORT_FIELD: &str = "relevance_score";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Keywords,
    Title,
    Company,
    Location,
    Industry,
}

impl SearchField {
    pub const ALL: [SearchField; 5] = [
        Self::Keywords,
        Self::Title,
        Self::Company,
        Self::Location,
        Self::Industry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::Title => "title",
            Self::Company => "company",
            Self::Location => "location",
            Self::Industry => "industry",
        }
    }
}

impl std::str::FromStr for SearchField {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "keywords" => Ok(Self::Keywords),
            "title" => Ok(Self::Title),
            "company" => Ok(Self::Company),
            "location" => Ok(Self::Location),
            "industry" => Ok(Self::Industry),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOperator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

impl SearchOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        }
    }
}

impl std::str::FromStr for SearchOperator {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "contains" => Ok(Self::Contains),
            "equals" => Ok(Self::Equals),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SearchCriterion {
    pub field: SearchField,
    pub operator: SearchOperator,
    pub value: String,
}

impl SearchCriterion {
    pub fn new(field: SearchField, operator: SearchOperator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// A candidate search as submitted to the backend.
///
/// `Default` yields a bare query with every option unset; [`SearchQuery::new`]
/// carries the option values the search form submits.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    pub criteria: Vec<SearchCriterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_details: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
            max_results: Some(DEFAULT_MAX_RESULTS),
            include_details: Some(true),
            sort_by: Some(DEFAULT_SORT_FIELD.to_string()),
            sort_order: Some(SortOrder::Desc),
        }
    }

    pub fn criterion(
        mut self,
        field: SearchField,
        operator: SearchOperator,
        value: impl Into<String>,
    ) -> Self {
        self.criteria.push(SearchCriterion::new(field, operator, value));
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = Some(order);
        self
    }

    /// The form that is keyed in the cache and sent to the backend.
    pub fn normalized(&self) -> Self {
        Self {
            criteria: self
                .criteria
                .iter()
                .filter(|criterion| !criterion.is_blank())
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Field order follows the struct declaration and unset options are omitted.
    pub fn cache_key(&self) -> String {
        let normalized = self.normalized();
        serde_json::to_string(&normalized).unwrap_or_else(|_| format!("{normalized:?}"))
    }
}
