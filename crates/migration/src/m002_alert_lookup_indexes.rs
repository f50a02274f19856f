use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_alert_lookup_indexes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

// Cooldown looks up the newest alert per rule; resolve scans firing alerts per rule.
const UP_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_alerts_rule_fired_at ON alerts(rule_id, fired_at DESC);
CREATE INDEX IF NOT EXISTS idx_alerts_rule_status ON alerts(rule_id, status);
";

const DOWN_SQL: &str = "
DROP INDEX IF EXISTS idx_alerts_rule_status;
DROP INDEX IF EXISTS idx_alerts_rule_fired_at;
";
