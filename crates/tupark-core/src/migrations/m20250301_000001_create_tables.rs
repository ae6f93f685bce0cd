use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ── users ──
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ── activity_logs ──
        // AUTOINCREMENT keeps ids strictly increasing across deletes, which
        // retention pruning relies on.
        manager
            .create_table(
                Table::create()
                    .table(ActivityLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ActivityLogs::Username).string().not_null())
                    .col(ColumnDef::new(ActivityLogs::Action).string().not_null())
                    .col(ColumnDef::new(ActivityLogs::Details).text().not_null())
                    .col(ColumnDef::new(ActivityLogs::IpAddress).string().not_null())
                    .col(
                        ColumnDef::new(ActivityLogs::Timestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ── slots ──
        manager
            .create_table(
                Table::create()
                    .table(Slots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Slots::SlotNumber)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Slots::Status)
                            .string()
                            .not_null()
                            .default("available"),
                    )
                    .col(ColumnDef::new(Slots::PlateNumber).string().null())
                    .col(ColumnDef::new(Slots::VehicleType).string().null())
                    .col(ColumnDef::new(Slots::StartTime).timestamp().null())
                    .col(ColumnDef::new(Slots::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slots_plate_number")
                    .table(Slots::Table)
                    .col(Slots::PlateNumber)
                    .to_owned(),
            )
            .await?;

        // ── problem_reports ──
        manager
            .create_table(
                Table::create()
                    .table(ProblemReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProblemReports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProblemReports::Category).string().not_null())
                    .col(ColumnDef::new(ProblemReports::Description).text().not_null())
                    .col(
                        ColumnDef::new(ProblemReports::ReporterName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProblemReports::PlateNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProblemReports::ReportDate)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProblemReports::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Slots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum ActivityLogs {
    Table,
    Id,
    Username,
    Action,
    Details,
    IpAddress,
    Timestamp,
}

#[derive(Iden)]
enum Slots {
    Table,
    SlotNumber,
    Status,
    PlateNumber,
    VehicleType,
    StartTime,
    UpdatedAt,
}

#[derive(Iden)]
enum ProblemReports {
    Table,
    Id,
    Category,
    Description,
    ReporterName,
    PlateNumber,
    ReportDate,
}
