use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tupark_core::migrations::Migrator;
use tupark_core::parking::{ParkingService, ReportSubmission, SpotStatus, SpotUpdate};
use tupark_core::{AuditAction, AuditEntry, AuditLog, Identity, TestApp, TuparkError};

async fn service() -> (ParkingService, AuditLog) {
    let db = tupark_core::db::connect(&TestApp::base_config())
        .await
        .expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    let audit = AuditLog::in_memory(100);
    let parking = ParkingService::new(db, audit.clone());
    parking
        .ensure_slots(&["A1".to_string(), "A2".to_string()])
        .await
        .unwrap();
    (parking, audit)
}

fn occupy(slot: &str, plate: &str, vehicle: &str) -> SpotUpdate {
    SpotUpdate {
        slot_id: slot.to_string(),
        status: SpotStatus::Occupied,
        plate_number: Some(plate.to_string()),
        vehicle_type: Some(vehicle.to_string()),
        park_time: None,
    }
}

fn release(slot: &str) -> SpotUpdate {
    SpotUpdate {
        slot_id: slot.to_string(),
        status: SpotStatus::Available,
        plate_number: None,
        vehicle_type: None,
        park_time: None,
    }
}

fn source() -> Identity {
    Identity::parse("10.0.0.7").unwrap()
}

async fn wait_for_entries(audit: &AuditLog, count: usize) -> Vec<AuditEntry> {
    for _ in 0..200 {
        let entries = audit.list_recent().await.unwrap();
        if entries.len() >= count {
            return entries;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("audit log never reached {} entries", count);
}

fn report(plate: &str) -> ReportSubmission {
    ReportSubmission {
        category: "Damage".to_string(),
        description: "Scratched bumper".to_string(),
        name: "Juan".to_string(),
        plate: plate.to_string(),
    }
}

#[tokio::test]
async fn test_ensure_slots_is_idempotent() {
    let (parking, _) = service().await;
    let created = parking
        .ensure_slots(&["A1".to_string(), "B9".to_string()])
        .await
        .unwrap();
    assert_eq!(created, 1);

    let spots = parking.list_spots().await.unwrap();
    let numbers: Vec<&str> = spots.iter().map(|s| s.slot_number.as_str()).collect();
    assert_eq!(numbers, vec!["A1", "A2", "B9"]);
    assert!(spots.iter().all(|s| s.status == "available"));
}

#[tokio::test]
async fn test_occupy_and_release() {
    let (parking, audit) = service().await;

    let spot = parking
        .update_spot(occupy("A1", "ABC-123", "Car"), "admin", &source())
        .await
        .unwrap();
    assert_eq!(spot.status, "occupied");
    assert_eq!(spot.plate_number.as_deref(), Some("ABC-123"));
    assert!(spot.start_time.is_some());

    let spot = parking
        .update_spot(release("A1"), "admin", &source())
        .await
        .unwrap();
    assert_eq!(spot.status, "available");
    assert!(spot.plate_number.is_none());
    assert!(spot.vehicle_type.is_none());
    assert!(spot.start_time.is_none());

    let entries = wait_for_entries(&audit, 2).await;
    let occupy_entry = entries
        .iter()
        .find(|e| e.action == AuditAction::OccupySpot)
        .unwrap();
    assert_eq!(occupy_entry.details, "Parked ABC-123 (Car) at A1");
    let release_entry = entries
        .iter()
        .find(|e| e.action == AuditAction::ReleaseSpot)
        .unwrap();
    assert_eq!(release_entry.details, "Released spot A1");
    assert_eq!(release_entry.actor, "admin");
}

#[tokio::test]
async fn test_rejects_invalid_plate_and_vehicle() {
    let (parking, _) = service().await;

    let err = parking
        .update_spot(occupy("A1", "12-ABC", "Car"), "admin", &source())
        .await
        .unwrap_err();
    assert!(matches!(err, TuparkError::Validation(_)));

    let err = parking
        .update_spot(occupy("A1", "ABC-123", "Truck"), "admin", &source())
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Invalid Vehicle Type selected.");
}

#[tokio::test]
async fn test_rejects_duplicate_plate() {
    let (parking, _) = service().await;
    parking
        .update_spot(occupy("A1", "XYZ 9876", "Van"), "admin", &source())
        .await
        .unwrap();

    let err = parking
        .update_spot(occupy("A2", "XYZ 9876", "Van"), "admin", &source())
        .await
        .unwrap_err();
    assert!(matches!(err, TuparkError::Conflict(_)));
    assert_eq!(
        err.public_message(),
        "Error: Vehicle XYZ 9876 is already parked at A1!"
    );

    // Re-parking the same vehicle in its own slot is allowed
    parking
        .update_spot(occupy("A1", "XYZ 9876", "Car"), "admin", &source())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_slot() {
    let (parking, _) = service().await;
    let err = parking
        .update_spot(release("Z9"), "admin", &source())
        .await
        .unwrap_err();
    assert!(matches!(err, TuparkError::NotFound(_)));
}

#[tokio::test]
async fn test_reports_require_parked_vehicle() {
    let (parking, _) = service().await;

    let err = parking.submit_report(report("ABC-123")).await.unwrap_err();
    assert_eq!(
        err.public_message(),
        "Report Failed: Vehicle ABC-123 is not currently parked in our facility."
    );

    let mut incomplete = report("ABC-123");
    incomplete.name = "  ".to_string();
    let err = parking.submit_report(incomplete).await.unwrap_err();
    assert_eq!(err.public_message(), "All fields are required.");
}

#[tokio::test]
async fn test_report_lifecycle() {
    let (parking, audit) = service().await;
    parking
        .update_spot(occupy("A2", "DEF-4567", "Motorcycle"), "admin", &source())
        .await
        .unwrap();

    let first = parking.submit_report(report("DEF-4567")).await.unwrap();
    let second = parking.submit_report(report("DEF-4567")).await.unwrap();

    let reports = parking.list_reports().await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].id, second.id);

    parking
        .delete_report(first.id, "admin", &source())
        .await
        .unwrap();
    assert_eq!(parking.list_reports().await.unwrap().len(), 1);

    let err = parking
        .delete_report(first.id, "admin", &source())
        .await
        .unwrap_err();
    assert!(matches!(err, TuparkError::NotFound(_)));

    let entries = wait_for_entries(&audit, 2).await;
    let deleted = entries
        .iter()
        .find(|e| e.action == AuditAction::DeleteReport)
        .unwrap();
    assert_eq!(deleted.details, format!("Deleted report ID: {}", first.id));
}
