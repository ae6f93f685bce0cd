//! Parking slot occupancy and driver problem reports.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDateTime, Utc};
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::audit::{AppendMode, AuditAction, AuditLog, NewAuditEntry};
use crate::auth::Identity;
use crate::error::TuparkError;
use crate::models::problem_report::{self, Entity as ProblemReport};
use crate::models::slot::{self, Entity as Slot};

/// Plate numbers look like `ABC-123`, `ABC 1234` or `ABC123`.
static PLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{3}[- ]?\d{3,4}$").expect("plate regex is valid")
});

const MAX_PLATE_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Available,
    Occupied,
}

impl SpotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpotStatus::Available => "available",
            SpotStatus::Occupied => "occupied",
        }
    }
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum VehicleType {
    Car,
    Motorcycle,
    Van,
    Others,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "Car",
            VehicleType::Motorcycle => "Motorcycle",
            VehicleType::Van => "Van",
            VehicleType::Others => "Others",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = TuparkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Car" => Ok(VehicleType::Car),
            "Motorcycle" => Ok(VehicleType::Motorcycle),
            "Van" => Ok(VehicleType::Van),
            "Others" => Ok(VehicleType::Others),
            _ => Err(TuparkError::Validation(
                "Invalid Vehicle Type selected.".to_string(),
            )),
        }
    }
}

/// Check a plate number's length and format.
pub fn validate_plate(plate: &str) -> Result<(), TuparkError> {
    if plate.len() > MAX_PLATE_LEN {
        return Err(TuparkError::Validation(
            "Plate number is too long.".to_string(),
        ));
    }
    if !PLATE_REGEX.is_match(plate) {
        return Err(TuparkError::Validation(
            "Invalid Plate Number! Format must be LLL-DDD or LLL-DDDD (e.g., ABC-123).".to_string(),
        ));
    }
    Ok(())
}

// ── DTOs ──

/// Current state of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SpotView {
    pub slot_number: String,
    pub status: String,
    pub plate_number: Option<String>,
    pub vehicle_type: Option<String>,
    pub start_time: Option<NaiveDateTime>,
}

impl From<slot::Model> for SpotView {
    fn from(model: slot::Model) -> Self {
        SpotView {
            slot_number: model.slot_number,
            status: model.status,
            plate_number: model.plate_number,
            vehicle_type: model.vehicle_type,
            start_time: model.start_time,
        }
    }
}

/// Requested change to a slot.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SpotUpdate {
    pub slot_id: String,
    pub status: SpotStatus,
    pub plate_number: Option<String>,
    /// One of `Car`, `Motorcycle`, `Van`, `Others`
    pub vehicle_type: Option<String>,
    /// Defaults to the current time when occupying
    pub park_time: Option<NaiveDateTime>,
}

/// A problem report filed by a driver.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReportSubmission {
    pub category: String,
    pub description: String,
    pub name: String,
    pub plate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportView {
    pub id: i32,
    pub category: String,
    pub description: String,
    pub reporter_name: String,
    pub plate_number: String,
    pub report_date: NaiveDateTime,
}

impl From<problem_report::Model> for ReportView {
    fn from(model: problem_report::Model) -> Self {
        ReportView {
            id: model.id,
            category: model.category,
            description: model.description,
            reporter_name: model.reporter_name,
            plate_number: model.plate_number,
            report_date: model.report_date,
        }
    }
}

// ── Service ──

#[derive(Clone)]
pub struct ParkingService {
    db: DatabaseConnection,
    audit: AuditLog,
}

impl ParkingService {
    pub fn new(db: DatabaseConnection, audit: AuditLog) -> Self {
        ParkingService { db, audit }
    }

    /// Create any of `slot_numbers` that do not exist yet, as available.
    pub async fn ensure_slots(&self, slot_numbers: &[String]) -> Result<usize, TuparkError> {
        let mut created = 0;
        for number in slot_numbers {
            if Slot::find_by_id(number.clone()).one(&self.db).await?.is_some() {
                continue;
            }
            slot::ActiveModel {
                slot_number: Set(number.clone()),
                status: Set(SpotStatus::Available.as_str().to_string()),
                plate_number: Set(None),
                vehicle_type: Set(None),
                start_time: Set(None),
                updated_at: Set(Utc::now().naive_utc()),
            }
            .insert(&self.db)
            .await?;
            created += 1;
        }
        if created > 0 {
            tracing::info!(created, "Created parking slots");
        }
        Ok(created)
    }

    /// All slots ordered by slot number.
    pub async fn list_spots(&self) -> Result<Vec<SpotView>, TuparkError> {
        let slots = Slot::find()
            .order_by_asc(slot::Column::SlotNumber)
            .all(&self.db)
            .await?;
        Ok(slots.into_iter().map(SpotView::from).collect())
    }

    /// Occupy or release a slot on behalf of `actor`.
    pub async fn update_spot(
        &self,
        update: SpotUpdate,
        actor: &str,
        source: &Identity,
    ) -> Result<SpotView, TuparkError> {
        let existing = Slot::find_by_id(update.slot_id.clone())
            .one(&self.db)
            .await?
            .ok_or_else(|| TuparkError::NotFound(format!("Slot {} not found", update.slot_id)))?;

        let (model, details) = match update.status {
            SpotStatus::Occupied => {
                let plate = update
                    .plate_number
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default();
                validate_plate(plate)?;
                let vehicle_type: VehicleType =
                    update.vehicle_type.as_deref().unwrap_or_default().parse()?;

                let duplicate = Slot::find()
                    .filter(slot::Column::PlateNumber.eq(plate))
                    .filter(slot::Column::Status.eq(SpotStatus::Occupied.as_str()))
                    .filter(slot::Column::SlotNumber.ne(update.slot_id.as_str()))
                    .one(&self.db)
                    .await?;
                if let Some(other) = duplicate {
                    return Err(TuparkError::Conflict(format!(
                        "Error: Vehicle {} is already parked at {}!",
                        plate, other.slot_number
                    )));
                }

                let mut active = existing.into_active_model();
                active.status = Set(SpotStatus::Occupied.as_str().to_string());
                active.plate_number = Set(Some(plate.to_string()));
                active.vehicle_type = Set(Some(vehicle_type.as_str().to_string()));
                active.start_time = Set(Some(
                    update.park_time.unwrap_or_else(|| Utc::now().naive_utc()),
                ));
                active.updated_at = Set(Utc::now().naive_utc());

                let details = format!("Parked {} ({}) at {}", plate, vehicle_type, update.slot_id);
                (active.update(&self.db).await?, details)
            }
            SpotStatus::Available => {
                let mut active = existing.into_active_model();
                active.status = Set(SpotStatus::Available.as_str().to_string());
                active.plate_number = Set(None);
                active.vehicle_type = Set(None);
                active.start_time = Set(None);
                active.updated_at = Set(Utc::now().naive_utc());

                let details = format!("Released spot {}", update.slot_id);
                (active.update(&self.db).await?, details)
            }
        };

        let action = match update.status {
            SpotStatus::Occupied => AuditAction::OccupySpot,
            SpotStatus::Available => AuditAction::ReleaseSpot,
        };
        self.audit
            .append(
                NewAuditEntry::new(actor, action, details, source.as_str()),
                AppendMode::Detached,
            )
            .await;

        Ok(SpotView::from(model))
    }

    /// File a report about a vehicle that is currently parked.
    pub async fn submit_report(
        &self,
        submission: ReportSubmission,
    ) -> Result<ReportView, TuparkError> {
        let category = submission.category.trim();
        let description = submission.description.trim();
        let name = submission.name.trim();
        let plate = submission.plate.trim();
        if category.is_empty() || description.is_empty() || name.is_empty() || plate.is_empty() {
            return Err(TuparkError::Validation(
                "All fields are required.".to_string(),
            ));
        }

        let parked = Slot::find()
            .filter(slot::Column::PlateNumber.eq(plate))
            .filter(slot::Column::Status.eq(SpotStatus::Occupied.as_str()))
            .one(&self.db)
            .await?;
        if parked.is_none() {
            return Err(TuparkError::Validation(format!(
                "Report Failed: Vehicle {} is not currently parked in our facility.",
                plate
            )));
        }

        let report = problem_report::ActiveModel {
            category: Set(category.to_string()),
            description: Set(description.to_string()),
            reporter_name: Set(name.to_string()),
            plate_number: Set(plate.to_string()),
            report_date: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::info!(report_id = report.id, plate, "Problem report submitted");
        Ok(ReportView::from(report))
    }

    /// All reports, newest first.
    pub async fn list_reports(&self) -> Result<Vec<ReportView>, TuparkError> {
        let reports = ProblemReport::find()
            .order_by_desc(problem_report::Column::ReportDate)
            .order_by_desc(problem_report::Column::Id)
            .all(&self.db)
            .await?;
        Ok(reports.into_iter().map(ReportView::from).collect())
    }

    pub async fn delete_report(
        &self,
        id: i32,
        actor: &str,
        source: &Identity,
    ) -> Result<(), TuparkError> {
        let report = ProblemReport::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TuparkError::NotFound(format!("Report {} not found", id)))?;

        report.delete(&self.db).await?;

        self.audit
            .append(
                NewAuditEntry::new(
                    actor,
                    AuditAction::DeleteReport,
                    format!("Deleted report ID: {}", id),
                    source.as_str(),
                ),
                AppendMode::Detached,
            )
            .await;
        Ok(())
    }
}
