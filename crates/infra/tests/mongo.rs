//! Tests against a live MongoDB.
//!
//! Set `SVCKIT_TEST_MONGO_URI` to a throwaway server to run them; without it
//! every test returns early.

use std::sync::Arc;

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

use svckit_infra::{MongoConfig, MongoError, MongoPersistence};
use svckit_observability::TracingLogger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    value: i64,
}

async fn mongo(collection: &str) -> Option<MongoPersistence> {
    let host = std::env::var("SVCKIT_TEST_MONGO_URI").ok()?;
    svckit_observability::init();

    let cfg = MongoConfig {
        host,
        database: "svckit_test".to_string(),
        ..MongoConfig::default()
    };
    let mongo = MongoPersistence::connect(&cfg, Arc::new(TracingLogger::default()))
        .await
        .expect("failed to configure mongo client");
    mongo
        .database()
        .collection::<Document>(collection)
        .drop()
        .await
        .unwrap();
    Some(mongo)
}

#[tokio::test]
async fn inserted_documents_come_back_through_aggregate() {
    let Some(mongo) = mongo("svckit_readings").await else { return };

    for (sensor, value) in [("a", 3), ("b", 10), ("a", 1)] {
        let reading = Reading {
            sensor: sensor.to_string(),
            value,
        };
        mongo.insert_one("svckit_readings", &reading).await.unwrap();
    }

    let readings: Vec<Reading> = mongo
        .aggregate(
            "svckit_readings",
            [
                doc! { "$match": { "sensor": "a" } },
                doc! { "$sort": { "value": 1 } },
                doc! { "$project": { "_id": 0, "sensor": 1, "value": 1 } },
            ],
        )
        .await
        .unwrap();

    assert_eq!(
        readings,
        vec![
            Reading { sensor: "a".to_string(), value: 1 },
            Reading { sensor: "a".to_string(), value: 3 },
        ]
    );
}

#[tokio::test]
async fn undecodable_results_are_decode_errors() {
    let Some(mongo) = mongo("svckit_totals").await else { return };
    mongo
        .insert_one("svckit_totals", &doc! { "sensor": "a", "value": 2 })
        .await
        .unwrap();

    let err = mongo
        .aggregate::<Reading>(
            "svckit_totals",
            [doc! { "$group": { "_id": "$sensor", "total": { "$sum": "$value" } } }],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MongoError::Decode { .. }));
}

#[tokio::test]
async fn invalid_pipeline_is_a_command_error() {
    let Some(mongo) = mongo("svckit_invalid").await else { return };

    let err = mongo
        .aggregate::<Document>("svckit_invalid", [doc! { "$notAStage": {} }])
        .await
        .unwrap_err();

    assert!(matches!(err, MongoError::Command { operation: "aggregate", .. }));
}
