use crate::api::ApiError;
use crate::model::{self, Note, NoteId, TitleError, TITLE_INPUT_MAX};
use std::time::{Duration, Instant};

pub const STATUS_TTL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Edit,
    Create,
}

/// Adapter call the orchestrator wants executed. The event loop runs it on
/// a worker thread and reports back through the matching `finish_*` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Load { gen: u64 },
    Create { title: String, content: String },
    Update { id: NoteId, title: String, content: String },
    Delete { id: NoteId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftField {
    #[default]
    Title,
    Content,
}

#[derive(Debug, Clone, Default)]
pub struct FieldValue {
    pub value: String,
    pub cursor: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub title: FieldValue,
    pub content: FieldValue,
    pub field: DraftField,
}

struct StatusLine {
    text: String,
    set_at: Instant,
}

/// The UI state orchestrator: owns the note collection, selection, mode and
/// draft, and mediates every adapter call. It performs no I/O itself, which
/// keeps every user-observable behavior testable without a transport.
pub struct App {
    notes: Vec<Note>,
    selected: Option<NoteId>,
    mode: Mode,
    draft: Draft,
    busy: bool,
    loading: bool,
    load_gen: u64,
    title_touched: bool,
    status: Option<StatusLine>,
    error: Option<String>,
    pending_delete: Option<NoteId>,
}

impl App {
    pub fn new() -> Self {
        App {
            notes: Vec::new(),
            selected: None,
            mode: Mode::View,
            draft: Draft::default(),
            busy: false,
            loading: false,
            load_gen: 0,
            title_touched: false,
            status: None,
            error: None,
            pending_delete: None,
        }
    }

    // --- load / refresh ---

    /// Start a (re)load of the collection. Each call invalidates the results
    /// of any load still in flight via the generation counter.
    pub fn begin_refresh(&mut self) -> Option<Request> {
        if self.busy {
            return None;
        }
        self.load_gen += 1;
        self.loading = true;
        self.error = None;
        Some(Request::Load { gen: self.load_gen })
    }

    pub fn finish_load(&mut self, gen: u64, result: Result<Vec<Note>, ApiError>) {
        if gen != self.load_gen {
            // whoever asked for this load has been superseded; drop the result
            return;
        }
        self.loading = false;
        match result {
            Ok(mut notes) => {
                model::sort_notes(&mut notes);
                self.notes = notes;
                self.fix_selection();
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    // --- navigation ---

    pub fn select(&mut self, id: &str) {
        if !self.notes.iter().any(|n| n.id == id) {
            return;
        }
        self.selected = Some(id.to_string());
        self.mode = Mode::View;
        self.title_touched = false;
        self.sync_draft();
    }

    pub fn select_delta(&mut self, delta: isize) {
        if self.notes.is_empty() {
            return;
        }
        let current = self.selected_index().unwrap_or(0) as isize;
        let max = self.notes.len() as isize - 1;
        let target = (current + delta).clamp(0, max) as usize;
        let id = self.notes[target].id.clone();
        self.select(&id);
    }

    // --- mode transitions ---

    pub fn request_create(&mut self) {
        self.mode = Mode::Create;
        self.draft = Draft::default();
        self.title_touched = false;
        self.error = None;
    }

    pub fn request_edit(&mut self) {
        if self.mode != Mode::View || self.selected_note().is_none() {
            return;
        }
        self.draft = Draft::from_note(self.selected_note());
        self.mode = Mode::Edit;
        self.title_touched = false;
        self.error = None;
    }

    pub fn cancel(&mut self) {
        if self.mode == Mode::View {
            return;
        }
        self.mode = Mode::View;
        self.title_touched = false;
        self.sync_draft();
    }

    // --- save ---

    pub fn begin_save(&mut self) -> Option<Request> {
        if self.mode == Mode::View {
            return None;
        }
        self.title_touched = true;
        if model::validate_title(&self.draft.title.value).is_err() {
            return None;
        }
        if self.is_busy() {
            return None;
        }
        let title = self.draft.title.value.clone();
        let content = self.draft.content.value.clone();
        let request = match self.mode {
            Mode::Create => Request::Create { title, content },
            Mode::Edit => {
                let id = self.selected.clone()?;
                Request::Update { id, title, content }
            }
            Mode::View => return None,
        };
        self.busy = true;
        self.error = None;
        Some(request)
    }

    pub fn finish_create(&mut self, result: Result<Note, ApiError>) {
        self.busy = false;
        match result {
            Ok(note) => {
                let id = note.id.clone();
                self.notes.push(note);
                model::sort_notes(&mut self.notes);
                self.selected = Some(id);
                self.mode = Mode::View;
                self.title_touched = false;
                self.sync_draft();
                self.set_status("Saved.");
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    pub fn finish_update(&mut self, result: Result<Note, ApiError>) {
        self.busy = false;
        match result {
            Ok(note) => {
                let id = note.id.clone();
                match self.notes.iter_mut().find(|n| n.id == id) {
                    Some(slot) => *slot = note,
                    None => self.notes.push(note),
                }
                model::sort_notes(&mut self.notes);
                self.selected = Some(id);
                self.mode = Mode::View;
                self.title_touched = false;
                self.sync_draft();
                self.set_status("Updated.");
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    // --- delete ---

    pub fn request_delete(&mut self) {
        if self.mode != Mode::View || self.is_busy() {
            return;
        }
        self.pending_delete = self.selected.clone();
    }

    /// Answer the delete confirmation prompt. `true` issues the request.
    pub fn resolve_delete(&mut self, confirmed: bool) -> Option<Request> {
        let id = self.pending_delete.take()?;
        if !confirmed || self.is_busy() {
            return None;
        }
        self.busy = true;
        self.error = None;
        Some(Request::Delete { id })
    }

    pub fn finish_delete(&mut self, id: &str, result: Result<(), ApiError>) {
        self.busy = false;
        match result {
            Ok(()) => {
                self.notes.retain(|n| n.id != id);
                if self.selected.as_deref() == Some(id) {
                    self.selected = self.notes.first().map(|n| n.id.clone());
                }
                self.mode = Mode::View;
                self.sync_draft();
                self.set_status("Deleted.");
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    // --- draft editing ---

    pub fn insert_char(&mut self, ch: char) {
        if self.mode == Mode::View {
            return;
        }
        if self.draft.field == DraftField::Title {
            if ch == '\n' || self.draft.title.value.chars().count() >= TITLE_INPUT_MAX {
                return;
            }
            self.title_touched = true;
        }
        self.draft.active_field_mut().insert_char(ch);
    }

    pub fn backspace(&mut self) {
        if self.mode == Mode::View {
            return;
        }
        if self.draft.field == DraftField::Title {
            self.title_touched = true;
        }
        self.draft.active_field_mut().backspace();
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    // --- status ---

    pub fn tick(&mut self, now: Instant) {
        if let Some(status) = &self.status {
            if now.duration_since(status.set_at) >= STATUS_TTL {
                self.status = None;
            }
        }
    }

    fn set_status(&mut self, text: &str) {
        self.status = Some(StatusLine {
            text: text.to_string(),
            set_at: Instant::now(),
        });
    }

    // --- accessors ---

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_deref()?;
        self.notes.iter().position(|n| n.id == id)
    }

    pub fn selected_note(&self) -> Option<&Note> {
        let id = self.selected.as_deref()?;
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy || self.loading
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.text.as_str())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn title_error(&self) -> Option<TitleError> {
        if !self.title_touched {
            return None;
        }
        model::validate_title(&self.draft.title.value).err()
    }

    pub fn can_save(&self) -> bool {
        !self.is_busy() && model::validate_title(&self.draft.title.value).is_ok()
    }

    fn sync_draft(&mut self) {
        self.draft = Draft::from_note(self.selected_note());
    }

    fn fix_selection(&mut self) {
        let still_present = self
            .selected
            .as_deref()
            .map(|id| self.notes.iter().any(|n| n.id == id))
            .unwrap_or(false);
        if !still_present {
            self.selected = self.notes.first().map(|n| n.id.clone());
        }
        if self.mode == Mode::View {
            self.sync_draft();
        }
    }
}

impl Draft {
    fn from_note(note: Option<&Note>) -> Self {
        match note {
            Some(note) => Draft {
                title: FieldValue::new(&note.title),
                content: FieldValue::new(&note.content),
                field: DraftField::Title,
            },
            None => Draft::default(),
        }
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            DraftField::Title => DraftField::Content,
            DraftField::Content => DraftField::Title,
        };
    }

    pub fn prev_field(&mut self) {
        self.next_field();
    }

    pub fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            DraftField::Title => &mut self.title,
            DraftField::Content => &mut self.content,
        }
    }
}

impl FieldValue {
    pub fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_grapheme(self.cursor, &self.value);
    }

    pub fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_grapheme(self.cursor, &self.value);
    }

    pub fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    pub fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_grapheme(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

fn prev_grapheme(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_grapheme(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let mut line_idx = 0;
    for (i, start) in starts.iter().enumerate() {
        if *start <= cursor {
            line_idx = i;
        } else {
            break;
        }
    }
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    let mut col = 0;
    for (idx, _) in slice[..limit].char_indices() {
        if col == target_col {
            return start + idx;
        }
        col += 1;
    }
    start + limit
}
