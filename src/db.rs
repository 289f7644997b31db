use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    Adjustment, ComponentScore, CourseGrade, CourseStatus, EnrollmentRecord, GradeComponent,
    OfferingRecord, SectionLoad, StudentRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("8f2f2f6e-54b1-4a57-9a36-0d3a1f2e6c11")?,
            "Avery Lee",
            "avery.lee@university.edu",
            18,
        ),
        (
            Uuid::parse_str("1b6a9c2d-7e31-4a8f-9f04-5f2c7d8e9a22")?,
            "Jules Moreno",
            "jules.moreno@university.edu",
            18,
        ),
        (
            Uuid::parse_str("c4d5e6f7-0a1b-4c2d-8e3f-9a0b1c2d3e33")?,
            "Kiara Patel",
            "kiara.patel@university.edu",
            21,
        ),
    ];

    for (id, name, email, max_credits) in students {
        sqlx::query(
            r#"
            INSERT INTO registrar.students (id, full_name, email, max_credits)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, max_credits = EXCLUDED.max_credits
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(max_credits)
        .execute(pool)
        .await?;
    }

    let term_id: Uuid = sqlx::query(
        r#"
        INSERT INTO registrar.terms (id, code)
        VALUES ($1, $2)
        ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("2026-Fall")
    .fetch_one(pool)
    .await?
    .get("id");

    let offerings = vec![("CS101", 3), ("MATH200", 4), ("PHYS150", 3)];
    for (course_code, credits) in offerings {
        let offering_id: Uuid = sqlx::query(
            r#"
            INSERT INTO registrar.course_offerings (id, term_id, course_code, credits)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (term_id, course_code) DO UPDATE SET credits = EXCLUDED.credits
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(term_id)
        .bind(course_code)
        .bind(credits)
        .fetch_one(pool)
        .await?
        .get("id");

        let components = vec![
            ("Midterm", 30, 100.0_f64),
            ("Final", 50, 100.0),
            ("Participation", 20, 100.0),
        ];
        for (name, weight, max_score) in components {
            sqlx::query(
                r#"
                INSERT INTO registrar.grade_components (id, offering_id, name, weight, max_score)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (offering_id, name) DO UPDATE
                SET weight = EXCLUDED.weight, max_score = EXCLUDED.max_score
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(offering_id)
            .bind(name)
            .bind(weight)
            .bind(max_score)
            .execute(pool)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO registrar.enrollments (id, student_id, offering_id, status)
            SELECT gen_random_uuid(), s.id, $1, 'enrolled'
            FROM registrar.students s
            ON CONFLICT (student_id, offering_id) DO NOTHING
            "#,
        )
        .bind(offering_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_student_by_email(pool: &PgPool, email: &str) -> anyhow::Result<StudentRecord> {
    let row = sqlx::query(
        "SELECT id, full_name, email, max_credits FROM registrar.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student with email {email}"))?;

    Ok(StudentRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        max_credits: row.get("max_credits"),
    })
}

pub async fn fetch_offering(
    pool: &PgPool,
    term_code: &str,
    course_code: &str,
) -> anyhow::Result<OfferingRecord> {
    let row = sqlx::query(
        "SELECT o.id, t.code as term_code, o.course_code, o.credits \
         FROM registrar.course_offerings o \
         JOIN registrar.terms t ON t.id = o.term_id \
         WHERE t.code = $1 AND o.course_code = $2",
    )
    .bind(term_code)
    .bind(course_code)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no offering of {course_code} in term {term_code}"))?;

    Ok(OfferingRecord {
        id: row.get("id"),
        term_code: row.get("term_code"),
        course_code: row.get("course_code"),
        credits: row.get("credits"),
    })
}

pub async fn fetch_components(
    pool: &PgPool,
    offering_id: Uuid,
) -> anyhow::Result<Vec<GradeComponent>> {
    let rows = sqlx::query(
        "SELECT id, name, weight, max_score \
         FROM registrar.grade_components WHERE offering_id = $1 ORDER BY name",
    )
    .bind(offering_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| GradeComponent {
            id: row.get("id"),
            name: row.get("name"),
            weight: row.get("weight"),
            max_score: row.get("max_score"),
        })
        .collect())
}

/// Callers run the engine's entry gate first; the unique key rejects
/// duplicate names rather than silently re-weighting.
pub async fn insert_component(
    pool: &PgPool,
    offering_id: Uuid,
    component: &GradeComponent,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO registrar.grade_components (id, offering_id, name, weight, max_score)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (offering_id, name) DO NOTHING
        "#,
    )
    .bind(component.id)
    .bind(offering_id)
    .bind(&component.name)
    .bind(component.weight)
    .bind(component.max_score)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_scores(pool: &PgPool, offering_id: Uuid) -> anyhow::Result<Vec<ComponentScore>> {
    let rows = sqlx::query(
        "SELECT cs.student_id, cs.component_id, cs.score, cs.recorded_at \
         FROM registrar.component_scores cs \
         JOIN registrar.grade_components gc ON gc.id = cs.component_id \
         WHERE gc.offering_id = $1",
    )
    .bind(offering_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ComponentScore {
            student_id: row.get("student_id"),
            component_id: row.get("component_id"),
            score: row.get("score"),
            recorded_at: row.get("recorded_at"),
        })
        .collect())
}

pub async fn fetch_enrollments(
    pool: &PgPool,
    offering_id: Uuid,
) -> anyhow::Result<Vec<EnrollmentRecord>> {
    let rows = sqlx::query(
        "SELECT e.student_id, s.full_name, s.email, e.status \
         FROM registrar.enrollments e \
         JOIN registrar.students s ON s.id = e.student_id \
         WHERE e.offering_id = $1 ORDER BY s.email",
    )
    .bind(offering_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| EnrollmentRecord {
            student_id: row.get("student_id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            status: CourseStatus::parse(row.get::<String, _>("status").as_str()),
        })
        .collect())
}

/// At most one row of each kind exists per (student, offering),
/// enforced by the unique key.
pub async fn fetch_adjustment_amounts(
    pool: &PgPool,
    student_id: Uuid,
    offering_id: Uuid,
) -> anyhow::Result<(Option<f64>, Option<f64>)> {
    let rows = sqlx::query(
        "SELECT kind, amount FROM registrar.adjustments \
         WHERE student_id = $1 AND offering_id = $2",
    )
    .bind(student_id)
    .bind(offering_id)
    .fetch_all(pool)
    .await?;

    let mut bonus = None;
    let mut penalty = None;
    for row in rows {
        let kind: String = row.get("kind");
        let amount: f64 = row.get("amount");
        match kind.as_str() {
            "bonus" => bonus = Some(amount),
            "penalty" => penalty = Some(amount),
            _ => {}
        }
    }

    Ok((bonus, penalty))
}

/// A new adjustment of the same kind replaces the previous one.
pub async fn upsert_adjustment(pool: &PgPool, adjustment: &Adjustment) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO registrar.adjustments (id, student_id, offering_id, kind, amount, reason)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, offering_id, kind) DO UPDATE
        SET amount = EXCLUDED.amount, reason = EXCLUDED.reason
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(adjustment.student_id)
    .bind(adjustment.offering_id)
    .bind(adjustment.kind.as_str())
    .bind(adjustment.amount)
    .bind(&adjustment.reason)
    .execute(pool)
    .await?;

    Ok(())
}

/// Publication sink. A published row is frozen: the upsert only
/// touches rows still in draft, so recomputing after publication is a
/// no-op. Returns false when the row was left untouched.
pub async fn upsert_course_grade(pool: &PgPool, grade: &CourseGrade) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO registrar.course_grades
        (id, student_id, offering_id, raw_total, adjusted_total, letter, grade_point, is_published)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (student_id, offering_id) DO UPDATE
        SET raw_total = EXCLUDED.raw_total,
            adjusted_total = EXCLUDED.adjusted_total,
            letter = EXCLUDED.letter,
            grade_point = EXCLUDED.grade_point,
            is_published = EXCLUDED.is_published
        WHERE registrar.course_grades.is_published = FALSE
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(grade.student_id)
    .bind(grade.offering_id)
    .bind(grade.raw_total)
    .bind(grade.adjusted_total)
    .bind(&grade.letter)
    .bind(grade.grade_point)
    .bind(grade.is_published)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_course_grades(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Vec<(String, CourseGrade)>> {
    let rows = sqlx::query(
        "SELECT t.code as term_code, g.student_id, g.offering_id, o.course_code, o.credits, \
         g.raw_total, g.adjusted_total, g.letter, g.grade_point, g.is_published, \
         COALESCE(e.status, 'enrolled') as status \
         FROM registrar.course_grades g \
         JOIN registrar.course_offerings o ON o.id = g.offering_id \
         JOIN registrar.terms t ON t.id = o.term_id \
         LEFT JOIN registrar.enrollments e \
           ON e.student_id = g.student_id AND e.offering_id = g.offering_id \
         WHERE g.student_id = $1 \
         ORDER BY t.code, o.course_code",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let grade = CourseGrade {
                student_id: row.get("student_id"),
                offering_id: row.get("offering_id"),
                course_code: row.get("course_code"),
                raw_total: row.get("raw_total"),
                adjusted_total: row.get("adjusted_total"),
                letter: row.get("letter"),
                grade_point: row.get("grade_point"),
                credits: row.get("credits"),
                status: CourseStatus::parse(row.get::<String, _>("status").as_str()),
                is_published: row.get("is_published"),
            };
            (row.get("term_code"), grade)
        })
        .collect())
}

pub async fn enrolled_credits(
    pool: &PgPool,
    student_id: Uuid,
    term_code: &str,
) -> anyhow::Result<i32> {
    let row = sqlx::query(
        "SELECT COALESCE(SUM(o.credits), 0)::INT as credits \
         FROM registrar.enrollments e \
         JOIN registrar.course_offerings o ON o.id = e.offering_id \
         JOIN registrar.terms t ON t.id = o.term_id \
         WHERE e.student_id = $1 AND t.code = $2 AND e.status = 'enrolled'",
    )
    .bind(student_id)
    .bind(term_code)
    .fetch_one(pool)
    .await?;

    Ok(row.get("credits"))
}

pub async fn section_loads(
    pool: &PgPool,
    term_code: &str,
    course_codes: &[String],
) -> anyhow::Result<Vec<SectionLoad>> {
    let mut loads = Vec::with_capacity(course_codes.len());
    for code in course_codes {
        let offering = fetch_offering(pool, term_code, code).await?;
        loads.push(SectionLoad {
            section_code: offering.course_code,
            credits: offering.credits,
        });
    }
    Ok(loads)
}

/// A bad row is reported and skipped, never sinking the rest of the
/// batch. Returns scores written plus a message per rejected row.
pub async fn import_scores_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<(usize, Vec<String>)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        term: String,
        course_code: String,
        component: String,
        score: f64,
        recorded_at: NaiveDate,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;
    let mut rejected = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                rejected.push(format!("line {line}: unreadable row ({err})"));
                continue;
            }
        };

        let student = match fetch_student_by_email(pool, &row.email).await {
            Ok(student) => student,
            Err(err) => {
                rejected.push(format!("line {line}: {err}"));
                continue;
            }
        };

        let component = sqlx::query(
            "SELECT gc.id, gc.max_score \
             FROM registrar.grade_components gc \
             JOIN registrar.course_offerings o ON o.id = gc.offering_id \
             JOIN registrar.terms t ON t.id = o.term_id \
             WHERE t.code = $1 AND o.course_code = $2 AND gc.name = $3",
        )
        .bind(&row.term)
        .bind(&row.course_code)
        .bind(&row.component)
        .fetch_optional(pool)
        .await?;

        let Some(component) = component else {
            rejected.push(format!(
                "line {line}: no component '{}' on {} in {}",
                row.component, row.course_code, row.term
            ));
            continue;
        };

        let component_id: Uuid = component.get("id");
        let max_score: f64 = component.get("max_score");
        if row.score < 0.0 || row.score > max_score {
            rejected.push(format!(
                "line {line}: score {} for '{}' is outside [0, {max_score}]",
                row.score, row.component
            ));
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO registrar.component_scores (id, student_id, component_id, score, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (student_id, component_id) DO UPDATE
            SET score = EXCLUDED.score, recorded_at = EXCLUDED.recorded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student.id)
        .bind(component_id)
        .bind(row.score)
        .bind(row.recorded_at)
        .execute(pool)
        .await?;

        inserted += 1;
    }

    Ok((inserted, rejected))
}
