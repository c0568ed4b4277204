/// Schema Bootstrap Module
///
/// Creates the three gradebook tables when they are absent and reports how
/// many rows each holds. Existing tables are never altered.

use crate::core::Result;
use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS course (
    course_id INTEGER PRIMARY KEY,
    course_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student (
    student_id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student_grade (
    student_id INTEGER NOT NULL REFERENCES student (student_id),
    course_id INTEGER NOT NULL REFERENCES course (course_id),
    grade INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS student_grade_pair
    ON student_grade (student_id, course_id);
"#;

/// Row counts of the gradebook tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaSummary {
    pub courses: i64,
    pub students: i64,
    pub grades: i64,
}

/// Creates the gradebook tables and the (student_id, course_id) unique index.
///
/// The index is what makes the grade upsert a single conflict-resolving
/// statement, so it is created even when the tables already exist. It fails
/// if the existing `student_grade` table already holds duplicate pairs.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Whether `student_grade` carries a unique index (or primary key) over
/// exactly (student_id, course_id).
pub fn has_unique_grade_pair(conn: &Connection) -> Result<bool> {
    let mut indexes = conn.prepare(
        "SELECT name FROM pragma_index_list('student_grade') WHERE \"unique\" = 1",
    )?;
    let names = indexes
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut columns = conn.prepare("SELECT name FROM pragma_index_info(?1)")?;
    for name in names {
        let mut indexed = columns
            .query_map([&name], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        indexed.sort();
        if indexed == ["course_id", "student_id"] {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Counts the rows of each gradebook table.
pub fn schema_summary(conn: &Connection) -> Result<SchemaSummary> {
    let count = |table: &str| -> rusqlite::Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
    };

    Ok(SchemaSummary {
        courses: count("course")?,
        students: count("student")?,
        grades: count("student_grade")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GradebookError;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let summary = schema_summary(&conn).unwrap();
        assert_eq!(
            summary,
            SchemaSummary {
                courses: 0,
                students: 0,
                grades: 0
            }
        );
    }

    #[test]
    fn test_unique_index_rejects_duplicate_pair() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO course (course_id, course_name) VALUES (1, 'Math');
             INSERT INTO student (student_id, first_name, last_name) VALUES (1, 'Jane', 'Doe');
             INSERT INTO student_grade (student_id, course_id, grade) VALUES (1, 1, 70);",
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO student_grade (student_id, course_id, grade) VALUES (1, 1, 80)",
            [],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_unique_grade_pair_detection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE student_grade (student_id INTEGER, course_id INTEGER, grade INTEGER);
             CREATE INDEX by_student ON student_grade (student_id);",
        )
        .unwrap();
        assert!(!has_unique_grade_pair(&conn).unwrap());

        ensure_schema(&conn).unwrap();
        assert!(has_unique_grade_pair(&conn).unwrap());

        let keyed = Connection::open_in_memory().unwrap();
        keyed
            .execute_batch(
                "CREATE TABLE student_grade (
                    student_id INTEGER, course_id INTEGER, grade INTEGER,
                    PRIMARY KEY (course_id, student_id)
                 );",
            )
            .unwrap();
        assert!(has_unique_grade_pair(&keyed).unwrap());
    }

    #[test]
    fn test_index_fails_on_existing_duplicates() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE student_grade (student_id INTEGER, course_id INTEGER, grade INTEGER);
             INSERT INTO student_grade VALUES (1, 1, 70);
             INSERT INTO student_grade VALUES (1, 1, 80);",
        )
        .unwrap();

        match ensure_schema(&conn) {
            Err(GradebookError::Database(_)) => {}
            other => panic!("Expected Database error, got {:?}", other),
        }
    }
}
