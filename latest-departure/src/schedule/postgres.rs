//! Relational schedule store backed by PostgreSQL.
//!
//! Expects the GTFS-derived layout:
//! - `stop(stop_id, stop_name, stop_lat, stop_lon)`
//! - `edges(from_stop_id, to_stop_id, departure, arrival, trip_id,
//!   monday..sunday, start_date, end_date)` with `departure`/`arrival`
//!   stored as intervals since midnight and weekday flags as 0/1
//! - `transfer(from_stop_id, to_stop_id, transfer_type, min_transfer_time)`

use chrono::NaiveDate;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error};

use crate::domain::{
    Edge, ServiceTime, Stop, StopId, Transfer, TransferKind, TripId, weekday_column,
};

use super::{DatabaseConfig, ScheduleError, ScheduleStore};

/// Schedule store reading from PostgreSQL.
///
/// Holds one connection for its lifetime; the caller creates it once and
/// shares it with every traversal.
pub struct PostgresSchedule {
    client: Client,
}

impl PostgresSchedule {
    /// Connect using the given configuration.
    ///
    /// The connection driver runs on a spawned task and logs if it ends
    /// with an error.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ScheduleError> {
        let (client, connection) = tokio_postgres::connect(&config.connection_string(), NoTls)
            .await
            .map_err(|e| ScheduleError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "schedule database connection closed");
            }
        });

        debug!(host = %config.host, dbname = %config.dbname, "connected to schedule database");
        Ok(Self { client })
    }
}

impl ScheduleStore for PostgresSchedule {
    async fn list_stops(&self) -> Result<Vec<Stop>, ScheduleError> {
        let rows = self
            .client
            .query("SELECT stop_id, stop_name, stop_lat, stop_lon FROM stop", &[])
            .await?;
        rows.iter().map(stop_from_row).collect()
    }

    async fn edges_in_window(
        &self,
        date: NaiveDate,
        start: ServiceTime,
        end: ServiceTime,
    ) -> Result<Vec<Edge>, ScheduleError> {
        // weekday_column only yields fixed column names
        let query = format!(
            "SELECT from_stop_id, to_stop_id, \
                    EXTRACT(EPOCH FROM departure)::bigint, \
                    EXTRACT(EPOCH FROM arrival)::bigint, \
                    trip_id \
             FROM edges \
             WHERE departure >= make_interval(secs => $1) \
               AND departure <= make_interval(secs => $2) \
               AND {} = 1 \
               AND start_date <= $3 \
               AND end_date >= $3",
            weekday_column(date)
        );

        let start_secs = f64::from(start.seconds());
        let end_secs = f64::from(end.seconds());
        let rows = self
            .client
            .query(&query, &[&start_secs, &end_secs, &date])
            .await?;

        debug!(%date, %start, %end, rows = rows.len(), "queried edges");
        rows.iter().map(edge_from_row).collect()
    }

    async fn all_transfers(&self) -> Result<Vec<Transfer>, ScheduleError> {
        let rows = self
            .client
            .query(
                "SELECT from_stop_id, to_stop_id, min_transfer_time \
                 FROM transfer WHERE transfer_type = $1",
                &[&TransferKind::MinimumTime.code()],
            )
            .await?;
        rows.iter().map(transfer_from_row).collect()
    }
}

fn stop_id(row: &Row, idx: usize) -> Result<StopId, ScheduleError> {
    let raw: String = row.try_get(idx)?;
    StopId::parse(&raw).map_err(|e| ScheduleError::MalformedData(format!("{e}: {raw:?}")))
}

fn service_time(row: &Row, idx: usize) -> Result<ServiceTime, ScheduleError> {
    let secs: i64 = row.try_get(idx)?;
    u32::try_from(secs)
        .map(ServiceTime::from_seconds)
        .map_err(|_| ScheduleError::MalformedData(format!("time out of range: {secs}s")))
}

fn stop_from_row(row: &Row) -> Result<Stop, ScheduleError> {
    Ok(Stop {
        id: stop_id(row, 0)?,
        name: row.try_get(1)?,
        lat: row.try_get(2)?,
        lon: row.try_get(3)?,
    })
}

fn edge_from_row(row: &Row) -> Result<Edge, ScheduleError> {
    let trip: String = row.try_get(4)?;
    Ok(Edge::new(
        stop_id(row, 0)?,
        stop_id(row, 1)?,
        service_time(row, 2)?,
        service_time(row, 3)?,
        TripId::new(trip),
    ))
}

/// Rows are minimum-time transfers, so a missing duration is malformed.
fn min_transfer_secs(min_time: Option<i32>) -> Result<u32, ScheduleError> {
    let secs = min_time.ok_or_else(|| {
        ScheduleError::MalformedData("minimum-time transfer has no min_transfer_time".into())
    })?;
    u32::try_from(secs)
        .map_err(|_| ScheduleError::MalformedData(format!("negative min_transfer_time: {secs}")))
}

fn transfer_from_row(row: &Row) -> Result<Transfer, ScheduleError> {
    let from = stop_id(row, 0)?;
    let to = stop_id(row, 1)?;
    let secs = min_transfer_secs(row.try_get(2)?).map_err(|e| match e {
        ScheduleError::MalformedData(msg) => {
            ScheduleError::MalformedData(format!("{msg} ({from} -> {to})"))
        }
        other => other,
    })?;
    Ok(Transfer::new(from, to, secs))
}
