/// Query Module
///
/// Typed gradebook operations. Each one runs parameterized SQL against the
/// connection owned by [`Gradebook`] and maps rows into result structures.

use super::{schema, Gradebook};
use crate::core::{Entity, GradebookError, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::debug;

const UPSERT_GRADE_SQL: &str = "
    INSERT INTO student_grade (student_id, course_id, grade)
    VALUES (?1, ?2, ?3)
    ON CONFLICT (student_id, course_id) DO UPDATE SET grade = excluded.grade";

// Used when student_grade has no unique index on the pair, so ON CONFLICT
// has nothing to match. The surrounding IMMEDIATE transaction keeps the
// update/insert pair from interleaving with another writer.
const UPDATE_GRADE_SQL: &str =
    "UPDATE student_grade SET grade = ?3 WHERE student_id = ?1 AND course_id = ?2";
const INSERT_GRADE_SQL: &str = "
    INSERT INTO student_grade (student_id, course_id, grade)
    SELECT ?1, ?2, ?3
    WHERE NOT EXISTS (
        SELECT 1 FROM student_grade WHERE student_id = ?1 AND course_id = ?2
    )";

/// A course row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub name: String,
}

/// A student row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// One graded student within a course listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseGrade {
    pub first_name: String,
    pub last_name: String,
    pub grade: i64,
}

/// Looks up a student id by last name.
///
/// Every match is fetched so that a shared last name is reported instead of
/// silently resolving to whichever row the store returns first.
fn find_student_id(conn: &Connection, last_name: &str) -> Result<Option<i64>> {
    let mut stmt =
        conn.prepare_cached("SELECT student_id FROM student WHERE last_name = ?1 ORDER BY student_id")?;
    let ids = stmt
        .query_map([last_name], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    match ids.as_slice() {
        [] => Ok(None),
        [id] => Ok(Some(*id)),
        _ => Err(GradebookError::AmbiguousStudent {
            last_name: last_name.to_string(),
            matches: ids.len(),
        }),
    }
}

fn find_course_id(conn: &Connection, course_name: &str) -> Result<Option<i64>> {
    let id = conn
        .prepare_cached("SELECT course_id FROM course WHERE course_name = ?1 LIMIT 1")?
        .query_row([course_name], |row| row.get(0))
        .optional()?;
    Ok(id)
}

impl Gradebook {
    /// All courses ordered by name ascending.
    pub fn list_courses(&self) -> Result<Vec<Course>> {
        debug!("Listing courses");
        let mut stmt = self
            .conn
            .prepare("SELECT course_id, course_name FROM course ORDER BY course_name")?;
        let courses = stmt
            .query_map([], |row| {
                Ok(Course {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(courses)
    }

    /// All students in storage order.
    pub fn list_students(&self) -> Result<Vec<Student>> {
        debug!("Listing students");
        let mut stmt = self
            .conn
            .prepare("SELECT student_id, first_name, last_name FROM student")?;
        let students = stmt
            .query_map([], |row| {
                Ok(Student {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(students)
    }

    /// Every graded student of the course named exactly `course_name`.
    ///
    /// Returns an empty list when the course does not exist or has no grades.
    pub fn list_grades_for_course(&self, course_name: &str) -> Result<Vec<CourseGrade>> {
        debug!(course = course_name, "Listing grades for course");
        let mut stmt = self.conn.prepare(
            "SELECT s.first_name, s.last_name, g.grade
             FROM student_grade g
             JOIN student s ON s.student_id = g.student_id
             JOIN course c ON c.course_id = g.course_id
             WHERE c.course_name = ?1
             ORDER BY s.last_name, s.first_name",
        )?;
        let grades = stmt
            .query_map([course_name], |row| {
                Ok(CourseGrade {
                    first_name: row.get(0)?,
                    last_name: row.get(1)?,
                    grade: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(grades)
    }

    /// The grade of the student with `last_name` in `course_name`.
    ///
    /// `Ok(None)` when either name is unknown or no grade is recorded. The
    /// course is checked first, so an unknown course is "not found" even when
    /// the last name is shared.
    ///
    /// # Errors
    ///
    /// `GradebookError::AmbiguousStudent` when the last name is shared.
    pub fn get_grade(&self, course_name: &str, last_name: &str) -> Result<Option<i64>> {
        debug!(course = course_name, last_name, "Fetching grade");
        let Some(course_id) = find_course_id(&self.conn, course_name)? else {
            return Ok(None);
        };
        let Some(student_id) = find_student_id(&self.conn, last_name)? else {
            return Ok(None);
        };

        let grade = self
            .conn
            .query_row(
                "SELECT grade FROM student_grade WHERE student_id = ?1 AND course_id = ?2",
                [student_id, course_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(grade)
    }

    /// Id of the student with `last_name`, if exactly one exists.
    pub fn resolve_student_id(&self, last_name: &str) -> Result<Option<i64>> {
        find_student_id(&self.conn, last_name)
    }

    /// Id of the course named exactly `course_name`.
    pub fn resolve_course_id(&self, course_name: &str) -> Result<Option<i64>> {
        find_course_id(&self.conn, course_name)
    }

    /// Sets the grade of the student with `last_name` in `course_name`,
    /// inserting the row on first use and overwriting it afterwards.
    ///
    /// Both lookups and the write share one IMMEDIATE transaction. With a
    /// unique index on (student_id, course_id) the write is a single
    /// conflict-resolving statement; without one it is an update followed by
    /// a guarded insert.
    ///
    /// # Errors
    ///
    /// `GradebookError::NotFound` naming the student or course that does not
    /// exist, `GradebookError::AmbiguousStudent` for a shared last name.
    pub fn upsert_grade(&self, course_name: &str, last_name: &str, grade: i64) -> Result<()> {
        debug!(course = course_name, last_name, grade, "Upserting grade");
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let student_id = find_student_id(&tx, last_name)?
            .ok_or_else(|| GradebookError::NotFound(Entity::Student(last_name.to_string())))?;
        let course_id = find_course_id(&tx, course_name)?
            .ok_or_else(|| GradebookError::NotFound(Entity::Course(course_name.to_string())))?;

        if schema::has_unique_grade_pair(&tx)? {
            tx.execute(UPSERT_GRADE_SQL, params![student_id, course_id, grade])?;
        } else if tx.execute(UPDATE_GRADE_SQL, params![student_id, course_id, grade])? == 0 {
            tx.execute(INSERT_GRADE_SQL, params![student_id, course_id, grade])?;
        }
        tx.commit()?;
        Ok(())
    }
}
