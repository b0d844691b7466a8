//! Listing search filter normalization.
//!
//! Turns raw query-string pairs into a [`FilterDescriptor`]: a canonical,
//! order-independent description of a search. Two requests that mean the same
//! thing normalize to equal descriptors, which is what lets the cache key
//! encoder treat the descriptor as the identity of a result page.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const LIST_DELIMITER: char = ',';

/// Filterable listing attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    AreaSqFt,
    Bathrooms,
    Bedrooms,
    City,
    Furnished,
    IsVerified,
    ListingType,
    Price,
    State,
    Tags,
    Type,
}

impl FilterField {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::AreaSqFt => "areaSqFt",
            FilterField::Bathrooms => "bathrooms",
            FilterField::Bedrooms => "bedrooms",
            FilterField::City => "city",
            FilterField::Furnished => "furnished",
            FilterField::IsVerified => "isVerified",
            FilterField::ListingType => "listingType",
            FilterField::Price => "price",
            FilterField::State => "state",
            FilterField::Tags => "tags",
            FilterField::Type => "type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Constraint {
    Eq { value: FilterValue },
    /// Inclusive on both ends; at least one bound is present.
    Range { min: Option<f64>, max: Option<f64> },
    /// Matches when any of the (sorted, deduplicated) values is present.
    AnyOf { values: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("parameter `{param}` must be a finite number, got `{value}`")]
    NotANumber { param: &'static str, value: String },
    #[error("parameter `{param}` must be a whole number, got `{value}`")]
    NotAWholeNumber { param: &'static str, value: String },
    #[error("parameter `{param}` must be `true` or `false`, got `{value}`")]
    NotABoolean { param: &'static str, value: String },
    #[error("range for `{field}` is empty: minimum {min} exceeds maximum {max}")]
    EmptyRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescriptor {
    constraints: BTreeMap<FilterField, Constraint>,
    page: u32,
    page_size: u32,
}

impl FilterDescriptor {
    pub fn constraints(&self) -> &BTreeMap<FilterField, Constraint> {
        &self.constraints
    }

    pub fn constraint(&self, field: FilterField) -> Option<&Constraint> {
        self.constraints.get(&field)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of matching rows to skip before the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for FilterDescriptor {
    fn default() -> Self {
        Self {
            constraints: BTreeMap::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Param {
    Text(FilterField),
    Integer(FilterField),
    Flag(FilterField),
    Min(FilterField),
    Max(FilterField),
    List(FilterField),
    Page,
    PageSize,
    Limit,
}

impl Param {
    fn classify(name: &str) -> Option<(Param, &'static str)> {
        let param = match name {
            "type" => (Param::Text(FilterField::Type), "type"),
            "state" => (Param::Text(FilterField::State), "state"),
            "city" => (Param::Text(FilterField::City), "city"),
            "listingType" => (Param::Text(FilterField::ListingType), "listingType"),
            "bedrooms" => (Param::Integer(FilterField::Bedrooms), "bedrooms"),
            "bathrooms" => (Param::Integer(FilterField::Bathrooms), "bathrooms"),
            "furnished" => (Param::Flag(FilterField::Furnished), "furnished"),
            "isVerified" => (Param::Flag(FilterField::IsVerified), "isVerified"),
            "minPrice" => (Param::Min(FilterField::Price), "minPrice"),
            "maxPrice" => (Param::Max(FilterField::Price), "maxPrice"),
            "minArea" => (Param::Min(FilterField::AreaSqFt), "minArea"),
            "maxArea" => (Param::Max(FilterField::AreaSqFt), "maxArea"),
            "tags" => (Param::List(FilterField::Tags), "tags"),
            "page" => (Param::Page, "page"),
            "pageSize" => (Param::PageSize, "pageSize"),
            "limit" => (Param::Limit, "limit"),
            _ => return None,
        };
        Some(param)
    }
}

#[derive(Default)]
struct Pending {
    eq: BTreeMap<FilterField, FilterValue>,
    ranges: BTreeMap<FilterField, (Option<f64>, Option<f64>)>,
    lists: BTreeMap<FilterField, BTreeSet<String>>,
    page: Option<f64>,
    page_size: Option<f64>,
    limit: Option<f64>,
}

/// Normalize raw query parameters into a canonical descriptor.
///
/// Unknown parameters and empty values are ignored. Scalar parameters that
/// repeat keep their last value; list parameters accumulate.
pub fn normalize<'a, I>(params: I) -> Result<FilterDescriptor, FilterError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pending = Pending::default();

    for (name, raw) in params {
        let Some((param, canonical_name)) = Param::classify(name) else {
            continue;
        };
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }

        match param {
            Param::Text(field) => {
                pending
                    .eq
                    .insert(field, FilterValue::Text(value.to_string()));
            }
            Param::Integer(field) => {
                let number = parse_whole(canonical_name, value)?;
                pending.eq.insert(field, FilterValue::Integer(number));
            }
            Param::Flag(field) => {
                let flag = parse_flag(canonical_name, value)?;
                pending.eq.insert(field, FilterValue::Flag(flag));
            }
            Param::Min(field) => {
                let number = parse_finite(canonical_name, value)?;
                pending.ranges.entry(field).or_default().0 = Some(number);
            }
            Param::Max(field) => {
                let number = parse_finite(canonical_name, value)?;
                pending.ranges.entry(field).or_default().1 = Some(number);
            }
            Param::List(field) => {
                let items = value
                    .split(LIST_DELIMITER)
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string);
                pending.lists.entry(field).or_default().extend(items);
            }
            Param::Page => pending.page = Some(parse_finite(canonical_name, value)?),
            Param::PageSize => pending.page_size = Some(parse_finite(canonical_name, value)?),
            Param::Limit => pending.limit = Some(parse_finite(canonical_name, value)?),
        }
    }

    let mut constraints = BTreeMap::new();

    for (field, value) in pending.eq {
        constraints.insert(field, Constraint::Eq { value });
    }

    for (field, (min, max)) in pending.ranges {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(FilterError::EmptyRange {
                    field: field.as_str(),
                    min,
                    max,
                });
            }
        }
        constraints.insert(field, Constraint::Range { min, max });
    }

    for (field, values) in pending.lists {
        if values.is_empty() {
            continue;
        }
        constraints.insert(
            field,
            Constraint::AnyOf {
                values: values.into_iter().collect(),
            },
        );
    }

    let page = clamp_to(pending.page, 1, u32::MAX).unwrap_or(1);
    let page_size = clamp_to(pending.page_size.or(pending.limit), 1, MAX_PAGE_SIZE)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    Ok(FilterDescriptor {
        constraints,
        page,
        page_size,
    })
}

fn parse_finite(param: &'static str, value: &str) -> Result<f64, FilterError> {
    match value.parse::<f64>() {
        // Adding +0.0 folds -0.0 into 0.0 so both spell the same descriptor.
        Ok(number) if number.is_finite() => Ok(number + 0.0),
        _ => Err(FilterError::NotANumber {
            param,
            value: value.to_string(),
        }),
    }
}

fn parse_whole(param: &'static str, value: &str) -> Result<i64, FilterError> {
    let number = parse_finite(param, value)?;
    if number.fract() != 0.0 || number.abs() > f64::from(i32::MAX) {
        return Err(FilterError::NotAWholeNumber {
            param,
            value: value.to_string(),
        });
    }
    Ok(number as i64)
}

fn parse_flag(param: &'static str, value: &str) -> Result<bool, FilterError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(FilterError::NotABoolean {
            param,
            value: value.to_string(),
        }),
    }
}

fn clamp_to(value: Option<f64>, min: u32, max: u32) -> Option<u32> {
    value.map(|number| number.floor().clamp(f64::from(min), f64::from(max)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Result<FilterDescriptor, FilterError> {
        normalize(pairs.iter().copied())
    }

    #[test]
    fn parameter_order_does_not_change_descriptor() {
        let first = parse(&[
            ("minPrice", "1000"),
            ("maxPrice", "5000"),
            ("city", "Lagos"),
            ("page", "1"),
            ("pageSize", "10"),
        ])
        .unwrap();
        let second = parse(&[
            ("city", "Lagos"),
            ("maxPrice", "5000"),
            ("minPrice", "1000"),
            ("pageSize", "10"),
            ("page", "1"),
        ])
        .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn numeric_formatting_does_not_change_descriptor() {
        let plain = parse(&[("minPrice", "1000"), ("bedrooms", "2")]).unwrap();
        let decorated = parse(&[("minPrice", " 1e3 "), ("bedrooms", "2.0")]).unwrap();
        assert_eq!(plain, decorated);

        let negative_zero = parse(&[("minArea", "-0")]).unwrap();
        let zero = parse(&[("minArea", "0")]).unwrap();
        assert_eq!(negative_zero, zero);
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let descriptor = parse(&[("utm_source", "mail"), ("city", "Abuja")]).unwrap();
        assert_eq!(descriptor.constraints().len(), 1);
        assert_eq!(
            descriptor.constraint(FilterField::City),
            Some(&Constraint::Eq {
                value: FilterValue::Text("Abuja".to_string())
            })
        );
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for raw in ["abc", "NaN", "inf", "-infinity", "1e400"] {
            let err = parse(&[("maxPrice", raw)]).unwrap_err();
            assert!(
                matches!(err, FilterError::NotANumber { param: "maxPrice", .. }),
                "{raw} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn page_must_parse_even_though_it_is_clamped() {
        let err = parse(&[("page", "first")]).unwrap_err();
        assert!(matches!(err, FilterError::NotANumber { param: "page", .. }));
    }

    #[test]
    fn fractional_room_counts_are_rejected() {
        let err = parse(&[("bedrooms", "2.5")]).unwrap_err();
        assert!(matches!(err, FilterError::NotAWholeNumber { param: "bedrooms", .. }));
    }

    #[test]
    fn single_bound_range_is_valid() {
        let descriptor = parse(&[("maxArea", "900")]).unwrap();
        assert_eq!(
            descriptor.constraint(FilterField::AreaSqFt),
            Some(&Constraint::Range {
                min: None,
                max: Some(900.0)
            })
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = parse(&[("minPrice", "5000"), ("maxPrice", "1000")]).unwrap_err();
        assert!(matches!(err, FilterError::EmptyRange { field: "price", .. }));
    }

    #[test]
    fn list_values_are_trimmed_deduplicated_and_sorted() {
        let descriptor = parse(&[("tags", " pool ,garden,,pool"), ("tags", "balcony")]).unwrap();
        assert_eq!(
            descriptor.constraint(FilterField::Tags),
            Some(&Constraint::AnyOf {
                values: vec![
                    "balcony".to_string(),
                    "garden".to_string(),
                    "pool".to_string()
                ]
            })
        );

        let reordered = parse(&[("tags", "balcony,pool"), ("tags", "garden")]).unwrap();
        assert_eq!(descriptor, reordered);
    }

    #[test]
    fn delimiter_only_list_adds_no_constraint() {
        let descriptor = parse(&[("tags", " , ,")]).unwrap();
        assert!(descriptor.constraints().is_empty());
    }

    #[test]
    fn boolean_flags_accept_common_spellings() {
        let yes = parse(&[("furnished", "TRUE")]).unwrap();
        let one = parse(&[("furnished", "1")]).unwrap();
        assert_eq!(yes, one);

        let err = parse(&[("isVerified", "yes")]).unwrap_err();
        assert!(matches!(err, FilterError::NotABoolean { param: "isVerified", .. }));
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        let defaults = parse(&[]).unwrap();
        assert_eq!(defaults.page(), 1);
        assert_eq!(defaults.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(defaults.offset(), 0);

        let clamped = parse(&[("page", "-4"), ("pageSize", "5000")]).unwrap();
        assert_eq!(clamped.page(), 1);
        assert_eq!(clamped.page_size(), MAX_PAGE_SIZE);

        let tiny = parse(&[("page", "3.9"), ("pageSize", "0")]).unwrap();
        assert_eq!(tiny.page(), 3);
        assert_eq!(tiny.page_size(), 1);
        assert_eq!(tiny.offset(), 2);
    }

    #[test]
    fn page_size_takes_precedence_over_limit_alias() {
        let aliased = parse(&[("limit", "25")]).unwrap();
        assert_eq!(aliased.page_size(), 25);

        let both = parse(&[("limit", "25"), ("pageSize", "30")]).unwrap();
        assert_eq!(both.page_size(), 30);
    }

    #[test]
    fn empty_values_are_ignored() {
        let descriptor = parse(&[("city", "  "), ("minPrice", ""), ("page", "")]).unwrap();
        assert_eq!(descriptor, FilterDescriptor::default());
    }

    #[test]
    fn repeated_scalar_keeps_last_value() {
        let descriptor = parse(&[("city", "Lagos"), ("city", "Ibadan")]).unwrap();
        assert_eq!(
            descriptor.constraint(FilterField::City),
            Some(&Constraint::Eq {
                value: FilterValue::Text("Ibadan".to_string())
            })
        );
    }
}
