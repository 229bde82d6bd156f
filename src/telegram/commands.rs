//! Command recognition, argument parsing and the reply texts
//!
//! Handlers here are plain functions from store state to a [`Reply`]; all
//! store errors are turned into user-facing text at this level.

use indoc::indoc;

use crate::core::error::AppError;
use crate::core::export;
use crate::core::config;
use crate::storage::wells::{StoreError, WellStore};
use crate::telegram::bot::{Command, MenuButton};
use crate::telegram::session::{FieldSlot, FlowKind};
use crate::telegram::types::Reply;

pub const NO_DATA: &str = "Нет данных.";
pub const FALLBACK: &str = "Не понял. Воспользуйтесь /help или кнопками.";
pub const STORAGE_UNAVAILABLE: &str = "⚠️ Хранилище недоступно, попробуйте позже.";
pub const SESSION_EXPIRED: &str = "⌛ Время ввода истекло. Начните заново кнопкой «➕ Добавить» или «✏️ Обновить».";

const ADD_USAGE: &str = "Неверный формат. Пример:\n/add Северное|С-101|В работе|Комментарий";
const UPDATE_USAGE: &str = "Неверный формат. Пример:\n/update С-101|Завершено|Комментарий";

const HELP: &str = indoc! {"
    Команды:
    /add <Месторождение>|<№_Скважины>|<Статус>|<Комментарий> - добавить скважину
    /update <№_Скважины>|<Статус>|<Комментарий> - обновить
    /show - все скважины по месторождениям
    /fields - список месторождений
    /wells - список скважин
    /export - экспорт в CSV

    Или используй кнопки: 📍 Месторождения / 🛢 Скважины / ➕ Добавить / ✏️ Обновить
    Кнопки «Добавить» и «Обновить» спросят поля по одному."};

/// How an incoming text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    /// Known slash command with the rest of the message as arguments
    Command { command: Command, args: &'a str },
    /// Reply keyboard button label
    Button(MenuButton),
    /// Anything else: an answer to a pending step, or noise
    Text(&'a str),
}

/// Classifies message text. Known commands and button labels take priority
/// over everything else.
pub fn classify(text: &str) -> Input<'_> {
    if let Some(button) = MenuButton::from_label(text) {
        return Input::Button(button);
    }

    let trimmed = text.trim_start();
    let (token, rest) = match trimmed.find(char::is_whitespace) {
        Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
        None => (trimmed, ""),
    };

    match Command::parse_token(token) {
        Some(command) => Input::Command {
            command,
            args: rest.trim(),
        },
        None => Input::Text(text),
    }
}

/// Arguments of `/add`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddArgs {
    pub field: String,
    pub well: String,
    pub status: String,
    pub comment: String,
}

/// Arguments of `/update`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateArgs {
    pub well: String,
    pub status: String,
    pub comment: String,
}

/// Splits `args` on `|` into exactly `N` trimmed parts; the last part keeps
/// any further delimiters.
fn split_parts<const N: usize>(args: &str, usage: &str) -> Result<[String; N], AppError> {
    if args.trim().is_empty() {
        return Err(AppError::MalformedCommand(usage.to_string()));
    }

    let parts: Vec<String> = args.splitn(N, '|').map(|p| p.trim().to_string()).collect();
    <[String; N]>::try_from(parts).map_err(|_| {
        AppError::MalformedCommand(format!("Неверный формат. Нужно {} полей, разделённых '|'.", N))
    })
}

/// Parses `Месторождение|№|Статус|Комментарий`.
pub fn parse_add_args(args: &str) -> Result<AddArgs, AppError> {
    let [field, well, status, comment] = split_parts::<4>(args, ADD_USAGE)?;
    if field.is_empty() || well.is_empty() {
        return Err(AppError::MalformedCommand(
            "Неверный формат. Месторождение и номер скважины не могут быть пустыми.".to_string(),
        ));
    }
    Ok(AddArgs {
        field,
        well,
        status,
        comment,
    })
}

/// Parses `№|Статус|Комментарий`.
pub fn parse_update_args(args: &str) -> Result<UpdateArgs, AppError> {
    let [well, status, comment] = split_parts::<3>(args, UPDATE_USAGE)?;
    if well.is_empty() {
        return Err(AppError::MalformedCommand(
            "Неверный формат. Номер скважины не может быть пустым.".to_string(),
        ));
    }
    Ok(UpdateArgs { well, status, comment })
}

pub fn start_text(first_name: Option<&str>) -> Reply {
    let greeting = match first_name {
        Some(name) if !name.trim().is_empty() => format!("Привет, {}! Выбери действие:", name.trim()),
        _ => "Привет! Выбери действие:".to_string(),
    };
    Reply::WithMenu(greeting)
}

pub fn help_text() -> Reply {
    Reply::text(HELP)
}

/// Creates a record and reports the outcome.
pub fn create_record(store: &WellStore, field: &str, well: &str, status: &str, comment: &str) -> Reply {
    match store.create(field, well, status, comment) {
        Ok(_) => {
            crate::core::metrics::record_store_operation("create", "ok");
            Reply::text(format!("✅ Скважина {} добавлена в месторождение {}.", well, field))
        }
        Err(StoreError::DuplicateKey(well)) => {
            crate::core::metrics::record_store_operation("create", "duplicate");
            Reply::text(format!("❌ Не удалось добавить: скважина {} уже существует.", well))
        }
        Err(e) => storage_failure("create", e),
    }
}

/// Updates a record and reports the outcome.
pub fn update_record(store: &WellStore, well: &str, status: &str, comment: &str) -> Reply {
    match store.update(well, status, comment) {
        Ok(()) => {
            crate::core::metrics::record_store_operation("update", "ok");
            Reply::text(format!("✅ Данные по {} обновлены.", well))
        }
        Err(StoreError::NotFound(well)) => {
            crate::core::metrics::record_store_operation("update", "not_found");
            Reply::text(format!("❌ Не удалось обновить: скважина {} не найдена.", well))
        }
        Err(e) => storage_failure("update", e),
    }
}

pub fn add_command(store: &WellStore, args: &str) -> Reply {
    match parse_add_args(args) {
        Ok(a) => create_record(store, &a.field, &a.well, &a.status, &a.comment),
        Err(e) => malformed(e),
    }
}

pub fn update_command(store: &WellStore, args: &str) -> Reply {
    match parse_update_args(args) {
        Ok(a) => update_record(store, &a.well, &a.status, &a.comment),
        Err(e) => malformed(e),
    }
}

pub fn fields_reply(store: &WellStore) -> Reply {
    match store.distinct_fields() {
        Ok(fields) if fields.is_empty() => Reply::text(NO_DATA),
        Ok(fields) => Reply::text(export::fields_listing(&fields)),
        Err(e) => storage_failure("fields", e),
    }
}

pub fn wells_reply(store: &WellStore) -> Reply {
    match store.list_all() {
        Ok(records) if records.is_empty() => Reply::text(NO_DATA),
        Ok(records) => Reply::text(export::wells_listing(&records)),
        Err(e) => storage_failure("wells", e),
    }
}

pub fn show_reply(store: &WellStore) -> Reply {
    match store.list_all() {
        Ok(records) if records.is_empty() => Reply::text(NO_DATA),
        Ok(records) => Reply::text(export::records_to_text(&records)),
        Err(e) => storage_failure("show", e),
    }
}

pub fn export_reply(store: &WellStore) -> Reply {
    // An empty store still exports the header row
    let records = match store.list_all() {
        Ok(records) => records,
        Err(e) => return storage_failure("export", e),
    };

    match export::records_to_csv(&records) {
        Ok(content) => Reply::Document {
            file_name: config::export::FILE_NAME.to_string(),
            content,
            caption: Some(format!("📄 Экспорт: {} скв.", records.len())),
        },
        Err(e) => {
            log::error!("Failed to build CSV export: {}", e);
            Reply::text(format!("❌ Ошибка экспорта: {}", e))
        }
    }
}

/// Question asked for one step of a multi-step flow.
pub fn prompt(slot: FieldSlot) -> &'static str {
    match slot {
        FieldSlot::Field => "Введите название месторождения:",
        FieldSlot::Well => "Введите номер скважины:",
        FieldSlot::Status => "Введите статус:",
        FieldSlot::Comment => "Введите комментарий:",
    }
}

pub fn flow_started(kind: FlowKind, first: FieldSlot) -> Reply {
    let title = match kind {
        FlowKind::Add => "➕ Добавление скважины.",
        FlowKind::Update => "✏️ Обновление скважины.",
    };
    Reply::text(format!("{}\n{}", title, prompt(first)))
}

pub fn step_rejected(slot: FieldSlot) -> Reply {
    Reply::text(format!("Пустое значение не подходит. {}", prompt(slot)))
}

fn malformed(err: AppError) -> Reply {
    match err {
        AppError::MalformedCommand(hint) => Reply::text(hint),
        other => Reply::text(format!("⚠️ Ошибка: {}", other)),
    }
}

fn storage_failure(operation: &str, err: StoreError) -> Reply {
    log::error!("Store {} failed: {}", operation, err);
    if matches!(operation, "create" | "update") {
        crate::core::metrics::record_store_operation(operation, "unavailable");
    }
    Reply::text(STORAGE_UNAVAILABLE)
}
