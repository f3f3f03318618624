//! Round-trip property tests
//!
//! For any value produced by validation, decoding the dumped JSON yields the
//! same value, as long as the export options keep every required key.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use reinhardt_schema_types::{ExportKwargs, SchemaAdapter, SchemaReference, SchemaType};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
struct Reading {
	sensor: String,
	value: f64,
	#[serde(default)]
	tags: Vec<String>,
	#[serde(default)]
	note: Option<String>,
	taken_at: DateTime<Utc>,
}

fn reading() -> impl Strategy<Value = Reading> {
	(
		"[a-z]{1,12}",
		-4000i32..4000,
		prop::collection::vec("[a-z0-9]{0,8}", 0..4),
		prop::option::of("[ -~]{0,16}"),
		0i64..4_000_000_000,
	)
		.prop_map(|(sensor, quarters, tags, note, seconds)| Reading {
			sensor,
			value: f64::from(quarters) / 4.0,
			tags,
			note,
			taken_at: Utc.timestamp_opt(seconds, 0).single().unwrap_or_default(),
		})
}

fn export_options() -> impl Strategy<Value = ExportKwargs> {
	(any::<bool>(), any::<bool>()).prop_map(|(strict, exclude_none)| {
		ExportKwargs::new()
			.with_strict(strict)
			.with_exclude_none(exclude_none)
	})
}

proptest! {
	#[test]
	fn prop_dump_then_validate_is_identity(reading in reading(), export in export_options()) {
		let adapter = SchemaAdapter::from_type(SchemaType::of::<Reading>(), export);
		let value = adapter.validate_python(serde_json::to_value(&reading).unwrap()).unwrap();

		let decoded = adapter.validate_json(adapter.dump_json(&value)).unwrap();

		prop_assert_eq!(&decoded, &value);
		prop_assert_eq!(decoded.to_typed::<Reading>().unwrap(), reading);
	}

	#[test]
	fn prop_list_round_trip(readings in prop::collection::vec(reading(), 0..5)) {
		let adapter = SchemaAdapter::from_type(
			SchemaReference::list(SchemaType::of::<Reading>()),
			ExportKwargs::new(),
		);
		let value = adapter.validate_python(json!(readings)).unwrap();

		let decoded = adapter.validate_python(adapter.dump_python(&value)).unwrap();

		prop_assert_eq!(decoded, value);
	}
}
