use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{
    Booking, BookingStatus, BookingTime, Building, CancellationStatus, Facility, FacilityManager,
    Group, GroupDirector, Role, User,
};

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_opt_dt(s: Option<String>) -> Option<NaiveDateTime> {
    s.map(|v| parse_dt(&v))
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn fmt_opt_dt(dt: &Option<NaiveDateTime>) -> Option<String> {
    dt.as_ref().map(fmt_dt)
}

// ── Users & Groups ──

pub fn insert_group(conn: &Connection, group: &Group) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO groups (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![group.id, group.name, fmt_dt(&group.created_at)],
    )?;
    Ok(())
}

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        image: row.get(4)?,
        role: Role::parse(&row.get::<_, String>(5)?),
        group_id: row.get(6)?,
        created_at: parse_dt(&row.get::<_, String>(7)?),
    })
}

const USER_COLS: &str = "id, employee_id, name, password_hash, image, role, group_id, created_at";

pub fn insert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, employee_id, name, password_hash, image, role, group_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.employee_id,
            user.name,
            user.password_hash,
            user.image,
            user.role.as_str(),
            user.group_id,
            fmt_dt(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
        params![id],
        parse_user_row,
    )
    .optional()
}

pub fn get_user_by_employee_id(
    conn: &Connection,
    employee_id: &str,
) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE employee_id = ?1"),
        params![employee_id],
        parse_user_row,
    )
    .optional()
}

pub fn set_user_role(conn: &Connection, user_id: &str, role: Role) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), user_id],
    )?;
    Ok(())
}

/// Re-derives the denormalized role column from the capability records.
/// Admin is assigned out of band and never recomputed. Must run inside the
/// same transaction as the capability change it follows.
pub fn recompute_user_role(conn: &Connection, user_id: &str) -> rusqlite::Result<()> {
    let current: Option<String> = conn
        .query_row(
            "SELECT role FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;

    if current.as_deref() == Some("ADMIN") {
        return Ok(());
    }

    let role = if get_facility_manager_for_user(conn, user_id)?.is_some() {
        Role::FacilityManager
    } else if get_group_director_for_user(conn, user_id)?.is_some() {
        Role::GroupDirector
    } else {
        Role::User
    };

    set_user_role(conn, user_id, role)
}

// ── Capability records ──

pub fn insert_group_director(conn: &Connection, director: &GroupDirector) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO group_directors (id, user_id, group_id) VALUES (?1, ?2, ?3)",
        params![director.id, director.user_id, director.group_id],
    )?;
    Ok(())
}

pub fn get_group_director_for_user(
    conn: &Connection,
    user_id: &str,
) -> rusqlite::Result<Option<GroupDirector>> {
    conn.query_row(
        "SELECT id, user_id, group_id FROM group_directors WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(GroupDirector {
                id: row.get(0)?,
                user_id: row.get(1)?,
                group_id: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn insert_facility_manager(
    conn: &Connection,
    manager: &FacilityManager,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO facility_managers (id, user_id) VALUES (?1, ?2)",
        params![manager.id, manager.user_id],
    )?;
    Ok(())
}

pub fn get_facility_manager_for_user(
    conn: &Connection,
    user_id: &str,
) -> rusqlite::Result<Option<FacilityManager>> {
    conn.query_row(
        "SELECT id, user_id FROM facility_managers WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(FacilityManager {
                id: row.get(0)?,
                user_id: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn delete_facility_manager(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM facility_managers WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn count_active_facilities_for_manager(
    conn: &Connection,
    manager_id: &str,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM facilities WHERE facility_manager_id = ?1 AND is_active = 1",
        params![manager_id],
        |row| row.get(0),
    )
}

// ── Buildings & Facilities ──

pub fn insert_building(conn: &Connection, building: &Building) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO buildings (id, name) VALUES (?1, ?2)",
        params![building.id, building.name],
    )?;
    Ok(())
}

pub fn list_buildings(conn: &Connection) -> rusqlite::Result<Vec<Building>> {
    let mut stmt = conn.prepare("SELECT id, name FROM buildings ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Building {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut buildings = vec![];
    for row in rows {
        buildings.push(row?);
    }
    Ok(buildings)
}

const FACILITY_COLS: &str = "id, slug, name, description, building_id, facility_manager_id, \
                             is_active, deleted_at, created_at";

fn parse_facility_row(row: &Row) -> rusqlite::Result<Facility> {
    Ok(Facility {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        building_id: row.get(4)?,
        facility_manager_id: row.get(5)?,
        is_active: row.get::<_, i64>(6)? != 0,
        deleted_at: parse_opt_dt(row.get(7)?),
        created_at: parse_dt(&row.get::<_, String>(8)?),
    })
}

pub fn insert_facility(conn: &Connection, facility: &Facility) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO facilities (id, slug, name, description, building_id, facility_manager_id, is_active, deleted_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            facility.id,
            facility.slug,
            facility.name,
            facility.description,
            facility.building_id,
            facility.facility_manager_id,
            facility.is_active as i64,
            fmt_opt_dt(&facility.deleted_at),
            fmt_dt(&facility.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_facility_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Facility>> {
    conn.query_row(
        &format!("SELECT {FACILITY_COLS} FROM facilities WHERE id = ?1"),
        params![id],
        parse_facility_row,
    )
    .optional()
}

pub fn get_facility_by_slug(conn: &Connection, slug: &str) -> rusqlite::Result<Option<Facility>> {
    conn.query_row(
        &format!("SELECT {FACILITY_COLS} FROM facilities WHERE slug = ?1"),
        params![slug],
        parse_facility_row,
    )
    .optional()
}

pub fn list_active_facilities(conn: &Connection) -> rusqlite::Result<Vec<Facility>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FACILITY_COLS} FROM facilities WHERE is_active = 1 ORDER BY name ASC"
    ))?;
    let rows = stmt.query_map([], parse_facility_row)?;

    let mut facilities = vec![];
    for row in rows {
        facilities.push(row?);
    }
    Ok(facilities)
}

/// Admin view of one facility: joined building and manager identity.
pub struct FacilityRecord {
    pub facility: Facility,
    pub building_name: String,
    pub manager_name: Option<String>,
    pub manager_employee_id: Option<String>,
}

pub fn list_facility_records(conn: &Connection) -> rusqlite::Result<Vec<FacilityRecord>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.slug, f.name, f.description, f.building_id, f.facility_manager_id,
                f.is_active, f.deleted_at, f.created_at,
                b.name, u.name, u.employee_id
         FROM facilities f
         JOIN buildings b ON f.building_id = b.id
         LEFT JOIN facility_managers fm ON f.facility_manager_id = fm.id
         LEFT JOIN users u ON fm.user_id = u.id
         ORDER BY f.name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(FacilityRecord {
            facility: parse_facility_row(row)?,
            building_name: row.get(9)?,
            manager_name: row.get(10)?,
            manager_employee_id: row.get(11)?,
        })
    })?;

    let mut records = vec![];
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

pub fn update_facility_fields(
    conn: &Connection,
    facility_id: &str,
    name: &str,
    description: Option<&str>,
    building_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE facilities SET name = ?1, description = ?2, building_id = ?3 WHERE id = ?4",
        params![name, description, building_id, facility_id],
    )?;
    Ok(())
}

pub fn set_facility_manager(
    conn: &Connection,
    facility_id: &str,
    manager_id: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE facilities SET facility_manager_id = ?1 WHERE id = ?2",
        params![manager_id, facility_id],
    )?;
    Ok(())
}

pub fn soft_delete_facility(conn: &Connection, facility_id: &str) -> rusqlite::Result<()> {
    let now = fmt_dt(&Utc::now().naive_utc());
    conn.execute(
        "UPDATE facilities SET is_active = 0, deleted_at = ?1 WHERE id = ?2",
        params![now, facility_id],
    )?;
    Ok(())
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, slug, title, purpose, status, cancellation_status, remark,
            status_update_at_gd, status_update_at_fm, status_update_at_admin,
            status_update_by_gd_id, status_update_by_fm_id,
            cancellation_remark, cancellation_requested_at,
            cancellation_update_at_gd, cancellation_update_at_fm, cancelled_at,
            facility_id, group_id, requested_by_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            booking.id,
            booking.slug,
            booking.title,
            booking.purpose,
            booking.status.as_str(),
            booking.cancellation_status.as_str(),
            booking.remark,
            fmt_opt_dt(&booking.status_update_at_gd),
            fmt_opt_dt(&booking.status_update_at_fm),
            fmt_opt_dt(&booking.status_update_at_admin),
            booking.status_update_by_gd_id,
            booking.status_update_by_fm_id,
            booking.cancellation_remark,
            fmt_opt_dt(&booking.cancellation_requested_at),
            fmt_opt_dt(&booking.cancellation_update_at_gd),
            fmt_opt_dt(&booking.cancellation_update_at_fm),
            fmt_opt_dt(&booking.cancelled_at),
            booking.facility_id,
            booking.group_id,
            booking.requested_by_id,
            fmt_dt(&booking.created_at),
        ],
    )?;
    Ok(())
}

pub fn insert_booking_time(conn: &Connection, time: &BookingTime) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO booking_times (id, booking_id, date, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            time.id,
            time.booking_id,
            time.date.format("%Y-%m-%d").to_string(),
            fmt_dt(&time.start),
            fmt_dt(&time.end),
        ],
    )?;
    Ok(())
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        purpose: row.get(3)?,
        status: BookingStatus::parse(&row.get::<_, String>(4)?),
        cancellation_status: CancellationStatus::parse(&row.get::<_, String>(5)?),
        remark: row.get(6)?,
        status_update_at_gd: parse_opt_dt(row.get(7)?),
        status_update_at_fm: parse_opt_dt(row.get(8)?),
        status_update_at_admin: parse_opt_dt(row.get(9)?),
        status_update_by_gd_id: row.get(10)?,
        status_update_by_fm_id: row.get(11)?,
        cancellation_remark: row.get(12)?,
        cancellation_requested_at: parse_opt_dt(row.get(13)?),
        cancellation_update_at_gd: parse_opt_dt(row.get(14)?),
        cancellation_update_at_fm: parse_opt_dt(row.get(15)?),
        cancelled_at: parse_opt_dt(row.get(16)?),
        facility_id: row.get(17)?,
        group_id: row.get(18)?,
        requested_by_id: row.get(19)?,
        created_at: parse_dt(&row.get::<_, String>(20)?),
    })
}

const BOOKING_COLS: &str = "b.id, b.slug, b.title, b.purpose, b.status, b.cancellation_status, b.remark, \
     b.status_update_at_gd, b.status_update_at_fm, b.status_update_at_admin, \
     b.status_update_by_gd_id, b.status_update_by_fm_id, \
     b.cancellation_remark, b.cancellation_requested_at, \
     b.cancellation_update_at_gd, b.cancellation_update_at_fm, b.cancelled_at, \
     b.facility_id, b.group_id, b.requested_by_id, b.created_at";

pub fn get_booking_by_slug(conn: &Connection, slug: &str) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings b WHERE b.slug = ?1"),
        params![slug],
        parse_booking_row,
    )
    .optional()
}

/// One booking joined with its slot and the names a client renders.
pub struct BookingRecord {
    pub booking: Booking,
    pub time: BookingTime,
    pub facility_slug: String,
    pub facility_name: String,
    pub requester_name: String,
    pub requester_employee_id: String,
    pub group_name: String,
}

const BOOKING_RECORD_FROM: &str = "FROM bookings b
     JOIN booking_times bt ON bt.booking_id = b.id
     JOIN facilities f ON b.facility_id = f.id
     JOIN users u ON b.requested_by_id = u.id
     JOIN groups g ON b.group_id = g.id";

fn booking_record_select() -> String {
    format!(
        "SELECT {BOOKING_COLS}, bt.id, bt.date, bt.start_time, bt.end_time, \
         f.slug, f.name, u.name, u.employee_id, g.name {BOOKING_RECORD_FROM}"
    )
}

fn parse_booking_record_row(row: &Row) -> rusqlite::Result<BookingRecord> {
    let booking = parse_booking_row(row)?;
    let time = BookingTime {
        id: row.get(21)?,
        booking_id: booking.id.clone(),
        date: parse_date(&row.get::<_, String>(22)?),
        start: parse_dt(&row.get::<_, String>(23)?),
        end: parse_dt(&row.get::<_, String>(24)?),
    };
    Ok(BookingRecord {
        booking,
        time,
        facility_slug: row.get(25)?,
        facility_name: row.get(26)?,
        requester_name: row.get(27)?,
        requester_employee_id: row.get(28)?,
        group_name: row.get(29)?,
    })
}

pub fn get_booking_record_by_slug(
    conn: &Connection,
    slug: &str,
) -> rusqlite::Result<Option<BookingRecord>> {
    conn.query_row(
        &format!("{} WHERE b.slug = ?1", booking_record_select()),
        params![slug],
        parse_booking_record_row,
    )
    .optional()
}

/// Whose bookings a listing covers: everything, one group, or the
/// facilities one manager owns.
pub enum BookingScope {
    All,
    Group(String),
    Manager(String),
}

#[derive(Default)]
pub struct BookingFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub facility_slug: Option<String>,
    pub employee_id: Option<String>,
    /// Admin listings keep the source system's day-31 upper bound for the
    /// month filter; role listings use the exact month length.
    pub lenient_month_end: bool,
}

fn month_range(year: i32, month: u32, lenient: bool) -> (String, String, bool) {
    let start = format!("{year:04}-{month:02}-01");
    if lenient {
        // Inclusive upper bound; never excludes a valid date.
        return (start, format!("{year:04}-{month:02}-31"), true);
    }
    let (next_y, next_m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    (start, format!("{next_y:04}-{next_m:02}-01"), false)
}

pub fn list_bookings(
    conn: &Connection,
    scope: &BookingScope,
    filter: &BookingFilter,
) -> rusqlite::Result<Vec<BookingRecord>> {
    let mut sql = booking_record_select();
    let mut clauses: Vec<String> = vec![];
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    match scope {
        BookingScope::All => {}
        BookingScope::Group(group_id) => {
            clauses.push(format!("b.group_id = ?{}", args.len() + 1));
            args.push(Box::new(group_id.clone()));
        }
        BookingScope::Manager(manager_id) => {
            clauses.push(format!("f.facility_manager_id = ?{}", args.len() + 1));
            args.push(Box::new(manager_id.clone()));
        }
    }

    if let Some(slug) = &filter.facility_slug {
        clauses.push(format!("f.slug = ?{}", args.len() + 1));
        args.push(Box::new(slug.clone()));
    }

    if let Some(employee_id) = &filter.employee_id {
        clauses.push(format!("u.employee_id = ?{}", args.len() + 1));
        args.push(Box::new(employee_id.clone()));
    }

    match (filter.year, filter.month) {
        (Some(year), Some(month)) => {
            let (start, end, inclusive) = month_range(year, month, filter.lenient_month_end);
            let op = if inclusive { "<=" } else { "<" };
            clauses.push(format!(
                "bt.date >= ?{} AND bt.date {op} ?{}",
                args.len() + 1,
                args.len() + 2
            ));
            args.push(Box::new(start));
            args.push(Box::new(end));
        }
        (Some(year), None) => {
            clauses.push(format!(
                "bt.date >= ?{} AND bt.date < ?{}",
                args.len() + 1,
                args.len() + 2
            ));
            args.push(Box::new(format!("{year:04}-01-01")));
            args.push(Box::new(format!("{:04}-01-01", year + 1)));
        }
        (None, Some(month)) => {
            // Month without year means the current year.
            let year = Utc::now().date_naive().year();
            let (start, end, inclusive) = month_range(year, month, filter.lenient_month_end);
            let op = if inclusive { "<=" } else { "<" };
            clauses.push(format!(
                "bt.date >= ?{} AND bt.date {op} ?{}",
                args.len() + 1,
                args.len() + 2
            ));
            args.push(Box::new(start));
            args.push(Box::new(end));
        }
        (None, None) => {}
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY bt.date ASC, bt.start_time ASC");

    let mut stmt = conn.prepare(&sql)?;
    let args_refs: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(args_refs.as_slice(), parse_booking_record_row)?;

    let mut records = vec![];
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

/// Approved and pending bookings shown on a facility page.
pub fn list_bookings_for_facility(
    conn: &Connection,
    facility_id: &str,
) -> rusqlite::Result<Vec<BookingRecord>> {
    let sql = format!(
        "{} WHERE b.facility_id = ?1
           AND b.status IN ('PENDING', 'APPROVED_BY_GD', 'APPROVED_BY_FM', 'APPROVED_BY_ADMIN')
         ORDER BY bt.date ASC, bt.start_time ASC",
        booking_record_select()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![facility_id], parse_booking_record_row)?;

    let mut records = vec![];
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

fn list_records(
    conn: &Connection,
    where_clause: &str,
    param: &str,
) -> rusqlite::Result<Vec<BookingRecord>> {
    let sql = format!(
        "{} WHERE {where_clause} ORDER BY b.created_at ASC",
        booking_record_select()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![param], parse_booking_record_row)?;

    let mut records = vec![];
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

pub fn list_pending_approvals_for_group(
    conn: &Connection,
    group_id: &str,
) -> rusqlite::Result<Vec<BookingRecord>> {
    list_records(conn, "b.group_id = ?1 AND b.status = 'PENDING'", group_id)
}

pub fn list_pending_approvals_for_manager(
    conn: &Connection,
    manager_id: &str,
) -> rusqlite::Result<Vec<BookingRecord>> {
    list_records(
        conn,
        "f.facility_manager_id = ?1 AND b.status IN ('PENDING', 'APPROVED_BY_GD')",
        manager_id,
    )
}

pub fn list_pending_cancellations_for_group(
    conn: &Connection,
    group_id: &str,
) -> rusqlite::Result<Vec<BookingRecord>> {
    list_records(
        conn,
        "b.group_id = ?1 AND b.cancellation_status = 'PENDING'",
        group_id,
    )
}

pub fn list_pending_cancellations_for_manager(
    conn: &Connection,
    manager_id: &str,
) -> rusqlite::Result<Vec<BookingRecord>> {
    list_records(
        conn,
        "f.facility_manager_id = ?1 AND b.cancellation_status = 'APPROVED_BY_GD'",
        manager_id,
    )
}

// ── Guarded status mutations ──
//
// Every mutation re-checks the precondition in its WHERE clause; zero
// affected rows means the booking moved underneath the caller and the
// handler reports the stale state instead of writing.

pub fn update_status_by_gd(
    conn: &Connection,
    booking_id: &str,
    expected: BookingStatus,
    next: BookingStatus,
    director_id: &str,
    remark: Option<&str>,
) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1, status_update_at_gd = ?2, status_update_by_gd_id = ?3,
             remark = COALESCE(?4, remark)
         WHERE id = ?5 AND status = ?6",
        params![
            next.as_str(),
            now,
            director_id,
            remark,
            booking_id,
            expected.as_str()
        ],
    )?;
    Ok(count > 0)
}

pub fn update_status_by_fm(
    conn: &Connection,
    booking_id: &str,
    expected: BookingStatus,
    next: BookingStatus,
    manager_id: &str,
    remark: Option<&str>,
) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1, status_update_at_fm = ?2, status_update_by_fm_id = ?3,
             remark = COALESCE(?4, remark)
         WHERE id = ?5 AND status = ?6",
        params![
            next.as_str(),
            now,
            manager_id,
            remark,
            booking_id,
            expected.as_str()
        ],
    )?;
    Ok(count > 0)
}

pub fn update_status_by_admin(
    conn: &Connection,
    booking_id: &str,
    expected: BookingStatus,
    next: BookingStatus,
    remark: Option<&str>,
) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET status = ?1, status_update_at_admin = ?2, remark = COALESCE(?3, remark)
         WHERE id = ?4 AND status = ?5",
        params![next.as_str(), now, remark, booking_id, expected.as_str()],
    )?;
    Ok(count > 0)
}

pub fn request_cancellation(
    conn: &Connection,
    booking_id: &str,
    remark: &str,
) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET cancellation_status = 'PENDING', cancellation_remark = ?1,
             cancellation_requested_at = ?2
         WHERE id = ?3 AND cancellation_status = 'NOT_REQUESTED'
           AND status IN ('APPROVED_BY_GD', 'APPROVED_BY_FM', 'APPROVED_BY_ADMIN')",
        params![remark, now, booking_id],
    )?;
    Ok(count > 0)
}

pub fn update_cancellation_by_gd(
    conn: &Connection,
    booking_id: &str,
    next: CancellationStatus,
) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET cancellation_status = ?1, cancellation_update_at_gd = ?2
         WHERE id = ?3 AND cancellation_status = 'PENDING'",
        params![next.as_str(), now, booking_id],
    )?;
    Ok(count > 0)
}

pub fn reject_cancellation_by_fm(conn: &Connection, booking_id: &str) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET cancellation_status = 'REJECTED_BY_FM', cancellation_update_at_fm = ?1
         WHERE id = ?2 AND cancellation_status = 'APPROVED_BY_GD'",
        params![now, booking_id],
    )?;
    Ok(count > 0)
}

/// Final cancellation sign-off: the booking itself flips to CANCELLED in
/// the same statement.
pub fn approve_cancellation_by_fm(conn: &Connection, booking_id: &str) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET cancellation_status = 'APPROVED_BY_FM', cancellation_update_at_fm = ?1,
             status = 'CANCELLED', cancelled_at = ?1
         WHERE id = ?2 AND cancellation_status = 'APPROVED_BY_GD'",
        params![now, booking_id],
    )?;
    Ok(count > 0)
}

/// Operational override: the manager cancels outright, skipping the chain.
pub fn force_cancel_by_fm(
    conn: &Connection,
    booking_id: &str,
    remark: &str,
) -> rusqlite::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings
         SET status = 'CANCELLED', cancellation_status = 'CANCELLED_BY_FM',
             cancellation_remark = ?1, cancellation_update_at_fm = ?2, cancelled_at = ?2
         WHERE id = ?3 AND status != 'CANCELLED'",
        params![remark, now, booking_id],
    )?;
    Ok(count > 0)
}

pub fn get_booking_time(
    conn: &Connection,
    booking_id: &str,
) -> rusqlite::Result<Option<BookingTime>> {
    conn.query_row(
        "SELECT id, booking_id, date, start_time, end_time FROM booking_times WHERE booking_id = ?1",
        params![booking_id],
        |row| {
            Ok(BookingTime {
                id: row.get(0)?,
                booking_id: row.get(1)?,
                date: parse_date(&row.get::<_, String>(2)?),
                start: parse_dt(&row.get::<_, String>(3)?),
                end: parse_dt(&row.get::<_, String>(4)?),
            })
        },
    )
    .optional()
}
