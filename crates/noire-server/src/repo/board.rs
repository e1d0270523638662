use chrono::Utc;
use noire_types::{
    AppError, BoardConnection, BoardContentType, BoardItem, CreateBoardItemRequest,
    DetectiveBoard, UpdateBoardItemRequest,
};
use sqlx::{Pool, Sqlite};

use crate::error_convert::SqlxErrorExt;

const BOARD_COLUMNS: &str = "b.id, b.case_id, b.created_by, b.created_at, b.updated_at";

/// Items with the title of whatever they link to.
const ITEM_SELECT: &str = r#"
    SELECT i.id, i.board_id, i.content_type, i.object_id, i.label, i.notes,
           i.position_x, i.position_y,
           CASE i.content_type
               WHEN 'evidence' THEN (SELECT e.title FROM evidence e WHERE e.id = i.object_id)
               WHEN 'suspect' THEN (SELECT s.full_name FROM suspects s WHERE s.id = i.object_id)
           END AS linked_title,
           i.created_at
    FROM board_items i
"#;

const CONNECTION_COLUMNS: &str = "id, board_id, from_item_id, to_item_id, note, created_at";

/// Fetch the board of a case, creating it first if needed. The flag is
/// true when this call created it. Concurrent callers converge on one row.
pub async fn get_or_create(
    pool: &Pool<Sqlite>,
    case_id: i64,
    created_by: i64,
) -> Result<(DetectiveBoard, bool), AppError> {
    let now = Utc::now();
    let inserted = sqlx::query(
        "INSERT INTO detective_boards (case_id, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?) ON CONFLICT(case_id) DO NOTHING",
    )
    .bind(case_id)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let board = sqlx::query_as::<_, DetectiveBoard>(&format!(
        "SELECT {BOARD_COLUMNS} FROM detective_boards b WHERE b.case_id = ?"
    ))
    .bind(case_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok((board, inserted.rows_affected() == 1))
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<DetectiveBoard>, AppError> {
    sqlx::query_as::<_, DetectiveBoard>(&format!(
        "SELECT {BOARD_COLUMNS} FROM detective_boards b WHERE b.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Boards, optionally for one case. `assignee` restricts to cases where
/// that user is the assigned detective or sergeant.
pub async fn list(
    pool: &Pool<Sqlite>,
    case_id: Option<i64>,
    assignee: Option<i64>,
) -> Result<Vec<DetectiveBoard>, AppError> {
    sqlx::query_as::<_, DetectiveBoard>(&format!(
        r#"
        SELECT {BOARD_COLUMNS}
        FROM detective_boards b
        JOIN cases c ON c.id = b.case_id
        WHERE (?1 IS NULL OR b.case_id = ?1)
          AND (?2 IS NULL OR c.assigned_detective_id = ?2 OR c.assigned_sergeant_id = ?2)
        ORDER BY b.id
        "#
    ))
    .bind(case_id)
    .bind(assignee)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn items(pool: &Pool<Sqlite>, board_id: i64) -> Result<Vec<BoardItem>, AppError> {
    sqlx::query_as::<_, BoardItem>(&format!("{ITEM_SELECT} WHERE i.board_id = ? ORDER BY i.id"))
        .bind(board_id)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn connections(
    pool: &Pool<Sqlite>,
    board_id: i64,
) -> Result<Vec<BoardConnection>, AppError> {
    sqlx::query_as::<_, BoardConnection>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM board_connections WHERE board_id = ? ORDER BY id"
    ))
    .bind(board_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

async fn touch(pool: &Pool<Sqlite>, board_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE detective_boards SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(board_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

// ── Items ───────────────────────────────────────────────────────────

pub async fn find_item(pool: &Pool<Sqlite>, id: i64) -> Result<Option<BoardItem>, AppError> {
    sqlx::query_as::<_, BoardItem>(&format!("{ITEM_SELECT} WHERE i.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn create_item(
    pool: &Pool<Sqlite>,
    req: &CreateBoardItemRequest,
    link: Option<(BoardContentType, i64)>,
) -> Result<BoardItem, AppError> {
    let label = req.label.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO board_items
            (board_id, content_type, object_id, label, notes, position_x, position_y, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(req.board)
    .bind(link.map(|(kind, _)| kind))
    .bind(link.map(|(_, object_id)| object_id))
    .bind(label)
    .bind(&req.notes)
    .bind(req.position_x)
    .bind(req.position_y)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    touch(pool, req.board).await?;

    find_item(pool, id)
        .await?
        .ok_or_else(|| AppError::internal("Board item vanished after insert"))
}

/// Move or relabel an item. `None` fields keep their value.
pub async fn update_item(
    pool: &Pool<Sqlite>,
    item: &BoardItem,
    req: &UpdateBoardItemRequest,
) -> Result<BoardItem, AppError> {
    sqlx::query(
        r#"
        UPDATE board_items
        SET label = COALESCE(?, label),
            notes = COALESCE(?, notes),
            position_x = COALESCE(?, position_x),
            position_y = COALESCE(?, position_y)
        WHERE id = ?
        "#,
    )
    .bind(req.label.as_deref().map(str::trim))
    .bind(req.notes.as_deref())
    .bind(req.position_x)
    .bind(req.position_y)
    .bind(item.id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    touch(pool, item.board_id).await?;

    find_item(pool, item.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Board item {} not found", item.id)))
}

/// Delete an item; its connections go with it.
pub async fn delete_item(pool: &Pool<Sqlite>, item: &BoardItem) -> Result<(), AppError> {
    sqlx::query("DELETE FROM board_items WHERE id = ?")
        .bind(item.id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    touch(pool, item.board_id).await
}

/// Whether the linked object exists and belongs to `case_id`.
pub async fn link_belongs_to_case(
    pool: &Pool<Sqlite>,
    kind: BoardContentType,
    object_id: i64,
    case_id: i64,
) -> Result<bool, AppError> {
    let sql = match kind {
        BoardContentType::Evidence => {
            "SELECT EXISTS (SELECT 1 FROM evidence WHERE id = ? AND case_id = ?)"
        }
        BoardContentType::Suspect => {
            "SELECT EXISTS (SELECT 1 FROM suspects WHERE id = ? AND case_id = ?)"
        }
    };
    sqlx::query_scalar::<_, bool>(sql)
        .bind(object_id)
        .bind(case_id)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

// ── Connections ─────────────────────────────────────────────────────

pub async fn find_connection(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<Option<BoardConnection>, AppError> {
    sqlx::query_as::<_, BoardConnection>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM board_connections WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Whether the two items are already connected, in either direction.
pub async fn connected(pool: &Pool<Sqlite>, a: i64, b: i64) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM board_connections \
         WHERE (from_item_id = ?1 AND to_item_id = ?2) OR (from_item_id = ?2 AND to_item_id = ?1))",
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn create_connection(
    pool: &Pool<Sqlite>,
    board_id: i64,
    from_item: i64,
    to_item: i64,
    note: Option<&str>,
) -> Result<BoardConnection, AppError> {
    let connection = sqlx::query_as::<_, BoardConnection>(&format!(
        "INSERT INTO board_connections (board_id, from_item_id, to_item_id, note, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING {CONNECTION_COLUMNS}"
    ))
    .bind(board_id)
    .bind(from_item)
    .bind(to_item)
    .bind(note.map(str::trim).filter(|n| !n.is_empty()))
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    touch(pool, board_id).await?;
    Ok(connection)
}

pub async fn delete_connection(pool: &Pool<Sqlite>, connection: &BoardConnection) -> Result<(), AppError> {
    sqlx::query("DELETE FROM board_connections WHERE id = ?")
        .bind(connection.id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    touch(pool, connection.board_id).await
}
