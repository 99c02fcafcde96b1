//! Source specifications for the civic datasets.
//!
//! One constructor per dataset, each returning the configuration record
//! the pipeline runs: declared columns, geography, filters, aggregation,
//! and null policy. Count-style presence features fill missing
//! geographies with zero; rate-style features keep the null so absence of
//! data is not misread as a structural zero.

use crate::aggregate::{AggFn, Aggregation, NullPolicy};
use crate::error::Result;
use crate::load::{ColumnSpec, RawRow};
use crate::pipeline::{SourceGeography, SourceSpec};
use crate::table::{CleansedTable, ValueType};
use detfeat_core::Grain;

/// 911 call descriptions treated as a close proxy for gun violence.
pub const CLOSE_PROXY_CALL_STRINGS: [&str; 11] = [
    "ASSAULT",
    "SHOTS",
    "SHOOTING",
    "CUTTING",
    "HOLD UP",
    "WEAP",
    "ROBBERY ARMED",
    "VIOLENT - ARMED",
    "RAPE",
    "STABBED",
    "SHOT",
];

/// Additional descriptions for the wider near-proxy whitelist.
pub const NEAR_PROXY_CALL_STRINGS: [&str; 5] = [
    "WITH WEAPON",
    "DV",
    "ABUSE",
    "BREAKING AND ENTERING",
    "BREAKING & ENTERING",
];

/// RMS offense descriptions counted as violent crime.
pub const VIOLENT_OFFENSE_STRINGS: [&str; 8] = [
    "MURDER",
    "HOMICIDE",
    "CSC",
    "ROBBERY",
    "CARJACKING",
    "ASSAULT",
    "SHOOTING",
    "WEAPONS OFFENSE",
];

fn close_proxy_call(row: &RawRow<'_>) -> bool {
    row.get("calldescription").map_or(false, |d| {
        CLOSE_PROXY_CALL_STRINGS.iter().any(|s| d.contains(s))
    })
}

fn violent_offense(row: &RawRow<'_>) -> bool {
    row.get("offense_description").map_or(false, |d| {
        VIOLENT_OFFENSE_STRINGS.iter().any(|s| d.contains(s))
    })
}

/// Census product GEO_IDs look like `1400000US26163517200`; the part
/// after `US` is the identifier.
fn census_geo_id(raw: &str) -> Option<String> {
    raw.split_once("US").map(|(_, id)| id.to_string())
}

/// Indicator column: 1 when the owner's state is not Michigan. The raw
/// column spells Michigan many ways ("MI", "Mich", "MICHIGAN", stray
/// whitespace), all of which count as in-state.
fn out_of_state_indicator(table: &mut CleansedTable) -> Result<()> {
    let col = table
        .column("owner_state")
        .ok_or_else(|| crate::error::FeatureError::Schema("missing column \"owner_state\"".into()))?;
    let values: Vec<Option<f64>> = (0..col.len())
        .map(|i| {
            col.get_str(i).map(|s| {
                let upper = s.to_uppercase();
                let in_state = upper.contains("MICH")
                    || upper.split_whitespace().any(|token| token == "MI");
                if in_state {
                    0.0
                } else {
                    1.0
                }
            })
        })
        .collect();
    table.add_float_column("out_of_state", values)
}

/// Gun-violence-proxy 911 calls, counted per geography.
///
/// The source file carries both coordinates and a pre-assigned block id;
/// the block id is used directly (the file's 2010-context assignment is
/// more accurate than re-deriving from snapped coordinates).
pub fn violence_calls() -> SourceSpec {
    SourceSpec {
        name: "violence_calls",
        filename: "open_data/911_Calls_For_Service.csv",
        columns: vec![
            ColumnSpec::new("calldescription", ValueType::Str),
            ColumnSpec::new("call_timestamp", ValueType::Str),
            ColumnSpec::new("block_id", ValueType::Float),
            ColumnSpec::new("category", ValueType::Str),
            ColumnSpec::new("officerinitiated", ValueType::Str),
            ColumnSpec::new("priority", ValueType::Str),
            ColumnSpec::new("oid", ValueType::Int),
            ColumnSpec::new("longitude", ValueType::Float),
            ColumnSpec::new("latitude", ValueType::Float),
        ],
        geography: SourceGeography::Keyed {
            grain: Grain::Block,
            id_column: "block_id",
        },
        row_filter: Some(close_proxy_call),
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("oid", "violence_calls", AggFn::Count)],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// DDOT bus stop counts.
pub fn ddot_bus_stops() -> SourceSpec {
    SourceSpec {
        name: "ddot_bus_stops",
        filename: "open_data/DDOT_Bus_Stops.csv",
        columns: vec![
            ColumnSpec::new("Latitude", ValueType::Float),
            ColumnSpec::new("Longitude", ValueType::Float),
            ColumnSpec::new("Shelter", ValueType::Int),
            ColumnSpec::new("Bench", ValueType::Int),
            ColumnSpec::new("Trash", ValueType::Int),
            ColumnSpec::new("StopID", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "Latitude",
            lon: "Longitude",
            oid: "StopID",
        },
        row_filter: None,
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("StopID", "bus_stops", AggFn::Count)],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// SMART (suburban) bus stop counts. The file covers the wider metro
/// area; stops outside the city drop out at assignment.
pub fn smart_bus_stops() -> SourceSpec {
    SourceSpec {
        name: "smart_bus_stops",
        filename: "open_data/SMART_Bus_Stops.csv",
        columns: vec![
            ColumnSpec::new("stop_lat", ValueType::Float),
            ColumnSpec::new("stop_lon", ValueType::Float),
            ColumnSpec::new("stop_id", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "stop_lat",
            lon: "stop_lon",
            oid: "stop_id",
        },
        row_filter: None,
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("stop_id", "smart_bus_stops", AggFn::Count)],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// Distinct active liquor licenses. Distinct license numbers, not rows:
/// one license can appear once per permit type.
pub fn liquor_licenses() -> SourceSpec {
    SourceSpec {
        name: "liquor_licenses",
        filename: "open_data/Liquor_Licenses.csv",
        columns: vec![
            ColumnSpec::new("X", ValueType::Float),
            ColumnSpec::new("Y", ValueType::Float),
            ColumnSpec::new("business_id", ValueType::Int),
            ColumnSpec::new("status", ValueType::Str),
            ColumnSpec::new("number", ValueType::Float),
            ColumnSpec::new("ObjectId", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "Y",
            lon: "X",
            oid: "ObjectId",
        },
        row_filter: None,
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("number", "liquor_licenses", AggFn::NUnique)],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// Violent RMS crime incident counts.
pub fn rms_crime() -> SourceSpec {
    SourceSpec {
        name: "rms_crime",
        filename: "open_data/RMS_Crime_Incidents.csv",
        columns: vec![
            ColumnSpec::new("offense_description", ValueType::Str),
            ColumnSpec::new("arrest_charge", ValueType::Str),
            ColumnSpec::new("longitude", ValueType::Float),
            ColumnSpec::new("latitude", ValueType::Float),
            ColumnSpec::new("oid", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "latitude",
            lon: "longitude",
            oid: "oid",
        },
        row_filter: Some(violent_offense),
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("oid", "rms_crime", AggFn::Count)],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// BSEED vacant property registration counts.
pub fn vacant_property_registrations() -> SourceSpec {
    SourceSpec {
        name: "vacant_property_registrations",
        filename: "open_data/Vacant_Property_Registrations.csv",
        columns: vec![
            ColumnSpec::new("lat", ValueType::Float),
            ColumnSpec::new("lon", ValueType::Float),
            ColumnSpec::new("record_id", ValueType::Int),
            ColumnSpec::new("date_status", ValueType::Str),
            ColumnSpec::new("ObjectId", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "lat",
            lon: "lon",
            oid: "ObjectId",
        },
        row_filter: None,
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new(
            "ObjectId",
            "vacant_registrations",
            AggFn::Count,
        )],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// Registered rental unit counts.
pub fn rental_statuses() -> SourceSpec {
    SourceSpec {
        name: "rental_statuses",
        filename: "open_data/Rental_Statuses.csv",
        columns: vec![
            ColumnSpec::new("X", ValueType::Float),
            ColumnSpec::new("Y", ValueType::Float),
            ColumnSpec::new("date_status", ValueType::Str),
            ColumnSpec::new("record_type", ValueType::Str),
            ColumnSpec::new("oid", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "Y",
            lon: "X",
            oid: "oid",
        },
        row_filter: None,
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("oid", "rental_counts", AggFn::Count)],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// Proportion of registered rentals whose owner is out of state. A rate,
/// so geographies without rentals stay null.
pub fn out_of_state_rental_ownership() -> SourceSpec {
    SourceSpec {
        name: "out_of_state_rental_ownership",
        filename: "open_data/Rental_Statuses.csv",
        columns: vec![
            ColumnSpec::new("X", ValueType::Float),
            ColumnSpec::new("Y", ValueType::Float),
            ColumnSpec::new("owner_state", ValueType::Str),
            ColumnSpec::new("oid", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "Y",
            lon: "X",
            oid: "oid",
        },
        row_filter: None,
        id_normalizer: None,
        derive: Some(out_of_state_indicator),
        aggregations: vec![Aggregation::new(
            "out_of_state",
            "out_of_state_rental_ownership",
            AggFn::Mean,
        )],
        null_policy: NullPolicy::Preserve,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// Project Green Light participating location counts.
pub fn project_green_light_locations() -> SourceSpec {
    SourceSpec {
        name: "project_green_light_locations",
        filename: "open_data/Project_Green_Light_Locations.csv",
        columns: vec![
            ColumnSpec::new("X", ValueType::Float),
            ColumnSpec::new("Y", ValueType::Float),
            ColumnSpec::new("business_type", ValueType::Str),
            ColumnSpec::new("precinct", ValueType::Int),
            ColumnSpec::new("live_date", ValueType::Str),
            ColumnSpec::new("ObjectId", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "Y",
            lon: "X",
            oid: "ObjectId",
        },
        row_filter: None,
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("ObjectId", "greenlights", AggFn::Count)],
        null_policy: NullPolicy::Preserve,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// DFD fire station location counts.
pub fn fire_stations() -> SourceSpec {
    SourceSpec {
        name: "fire_stations",
        filename: "open_data/DFD_Fire_Stations.csv",
        columns: vec![
            ColumnSpec::new("Lat", ValueType::Float),
            ColumnSpec::new("Long", ValueType::Float),
            ColumnSpec::new("FID", ValueType::Int),
        ],
        geography: SourceGeography::Points {
            lat: "Lat",
            lon: "Long",
            oid: "FID",
        },
        row_filter: None,
        id_normalizer: None,
        derive: None,
        aggregations: vec![Aggregation::new("FID", "fire_stations", AggFn::Count)],
        null_policy: NullPolicy::Preserve,
        refine_by_join: false,
        skip_data_rows: 0,
    }
}

/// Decennial census population, keyed by block.
pub fn population() -> SourceSpec {
    SourceSpec {
        name: "population",
        filename: "census/decennial_p1_population.csv",
        columns: vec![
            ColumnSpec::new("GEO_ID", ValueType::Str),
            ColumnSpec::new("P1_001N", ValueType::Float),
            ColumnSpec::new("NAME", ValueType::Str),
        ],
        geography: SourceGeography::Keyed {
            grain: Grain::Block,
            id_column: "GEO_ID",
        },
        row_filter: None,
        id_normalizer: Some(census_geo_id),
        derive: None,
        aggregations: vec![Aggregation::new("P1_001N", "population", AggFn::Sum)],
        null_policy: NullPolicy::FillZero,
        refine_by_join: false,
        skip_data_rows: 1,
    }
}

/// ACS household composition estimates, keyed by tract. Tract facts can
/// be asked for at finer grains; the value is imputed uniformly across
/// the tract's canonical children.
pub fn households() -> SourceSpec {
    SourceSpec {
        name: "households",
        filename: "census/acs_s1901_households.csv",
        columns: vec![
            ColumnSpec::new("GEO_ID", ValueType::Str),
            ColumnSpec::new("households", ValueType::Float),
            ColumnSpec::new("married_families", ValueType::Float),
            ColumnSpec::new("non_family_households", ValueType::Float),
        ],
        geography: SourceGeography::Keyed {
            grain: Grain::Tract,
            id_column: "GEO_ID",
        },
        row_filter: None,
        id_normalizer: Some(census_geo_id),
        derive: None,
        aggregations: vec![
            Aggregation::new("households", "households", AggFn::Sum),
            Aggregation::new("married_families", "married_families", AggFn::Sum),
            Aggregation::new(
                "non_family_households",
                "non_family_households",
                AggFn::Sum,
            ),
        ],
        null_policy: NullPolicy::Preserve,
        refine_by_join: true,
        skip_data_rows: 1,
    }
}

/// ACS income estimates, keyed by tract.
pub fn income() -> SourceSpec {
    SourceSpec {
        name: "income",
        filename: "census/acs_s1902_income.csv",
        columns: vec![
            ColumnSpec::new("GEO_ID", ValueType::Str),
            ColumnSpec::new("S1902_C01_019E", ValueType::Float),
            ColumnSpec::new("S1902_C03_001E", ValueType::Float),
        ],
        geography: SourceGeography::Keyed {
            grain: Grain::Tract,
            id_column: "GEO_ID",
        },
        row_filter: None,
        id_normalizer: Some(census_geo_id),
        derive: None,
        aggregations: vec![
            Aggregation::new("S1902_C01_019E", "per_capita_income", AggFn::Mean),
            Aggregation::new("S1902_C03_001E", "per_household_income", AggFn::Mean),
        ],
        null_policy: NullPolicy::Preserve,
        refine_by_join: true,
        skip_data_rows: 1,
    }
}

/// Every source in the catalog.
pub fn all_sources() -> Vec<SourceSpec> {
    vec![
        violence_calls(),
        ddot_bus_stops(),
        smart_bus_stops(),
        liquor_licenses(),
        rms_crime(),
        vacant_property_registrations(),
        rental_statuses(),
        out_of_state_rental_ownership(),
        project_green_light_locations(),
        fire_stations(),
        population(),
        households(),
        income(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RawTable, ValueColumn};
    use detfeat_core::GeoId;

    #[test]
    fn test_catalog_names_are_unique() {
        let sources = all_sources();
        let mut names: Vec<&str> = sources.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), sources.len());
    }

    #[test]
    fn test_count_sources_fill_zero() {
        for spec in [violence_calls(), ddot_bus_stops(), rms_crime()] {
            assert_eq!(spec.null_policy, NullPolicy::FillZero, "{}", spec.name);
        }
        for spec in [out_of_state_rental_ownership(), income(), households()] {
            assert_eq!(spec.null_policy, NullPolicy::Preserve, "{}", spec.name);
        }
    }

    #[test]
    fn test_only_tract_sources_refine() {
        for spec in all_sources() {
            if spec.refine_by_join {
                assert_eq!(spec.geography.min_grain(), Grain::Tract, "{}", spec.name);
            }
        }
    }

    #[test]
    fn test_census_geo_id_strips_prefix() {
        assert_eq!(
            census_geo_id("1400000US26163517200").as_deref(),
            Some("26163517200")
        );
        assert_eq!(census_geo_id("26163517200"), None);
    }

    #[test]
    fn test_out_of_state_indicator_spellings() {
        let ids = vec![GeoId::parse("261635172001001", Grain::Block).unwrap(); 5];
        let table = RawTable::new(
            vec!["owner_state".into()],
            vec![ValueColumn::Str(vec![
                Some("MI".into()),
                Some("Michigan".into()),
                Some("mich".into()),
                Some("OH".into()),
                None,
            ])],
        )
        .unwrap();
        let mut cleansed = CleansedTable::new(Grain::Block, ids, table).unwrap();
        out_of_state_indicator(&mut cleansed).unwrap();

        let col = cleansed.column("out_of_state").unwrap();
        assert_eq!(col.get_f64(0), Some(0.0));
        assert_eq!(col.get_f64(1), Some(0.0));
        assert_eq!(col.get_f64(2), Some(0.0));
        assert_eq!(col.get_f64(3), Some(1.0));
        assert!(col.is_null(4));
    }
}
