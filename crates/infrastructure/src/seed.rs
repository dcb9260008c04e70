use chrono::{DateTime, Duration, TimeZone, Utc};
use domain::{NewTodo, TodoError, TodoService, UserId};
use tracing::info;

/// 開発用のサンプル ToDo
pub fn demo_todos(now: DateTime<Utc>) -> Vec<NewTodo> {
    let lab_due = Utc
        .with_ymd_and_hms(2021, 3, 19, 7, 0, 0)
        .single()
        .unwrap_or(now);

    vec![
        NewTodo {
            title: "Prepare lab 04".to_string(),
            description: Some("Complete writing the model solution for the lab exercises.".to_string()),
            is_complete: Some(false),
            due_date: lab_due,
        },
        NewTodo {
            title: "Do the stuff".to_string(),
            description: Some("Lorem ipsum dolor sit amet, consectetur adipiscing elit.".to_string()),
            is_complete: Some(true),
            due_date: now + Duration::days(2),
        },
        NewTodo {
            title: "Build the things".to_string(),
            description: None,
            is_complete: Some(false),
            due_date: now - Duration::weeks(1),
        },
        NewTodo {
            title: "Charge the flux capacitors".to_string(),
            description: Some(
                "We can literally do this whenever, once we're done we can travel back in time."
                    .to_string(),
            ),
            is_complete: Some(false),
            due_date: now - Duration::days(365 * 100),
        },
    ]
}

/// サンプル ToDo を指定ユーザーの所有として投入
pub async fn seed_demo_todos(service: &TodoService, owner: &UserId) -> Result<usize, TodoError> {
    let todos = demo_todos(Utc::now());
    let count = todos.len();
    for fields in todos {
        service.create(fields, owner.clone()).await?;
    }
    info!(owner = %owner, count, "demo todos seeded");
    Ok(count)
}
