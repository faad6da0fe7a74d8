// File: src/tui/handlers.rs
use crate::board::{BoardCommand, BoardState, CardAction, CardTarget};
use crate::chat::SUGGESTIONS;
use crate::clipboard;
use crate::prefs::Preferences;
use crate::push::PushEvent;
use crate::tui::action::{Action, AppEvent};
use crate::tui::state::{AppState, HitTarget, Hitbox, Modal, Page, SettingsForm, TaskForm};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::widgets::ListState;

pub fn handle_app_event(state: &mut AppState, event: AppEvent) -> Option<Action> {
    match event {
        AppEvent::Status(s) => state.message = s,
        AppEvent::TasksFetched(ticket, result) => {
            if state.session.apply_fetch(ticket, result, Utc::now()) {
                state.loading = false;
                state.clamp_selection();
                state.message = match state.session.board() {
                    BoardState::Ready(view) => format!("Loaded {} tasks.", view.card_count()),
                    BoardState::Failed(msg) => msg.clone(),
                    BoardState::Loading => "Loading...".to_string(),
                };
            }
        }
        AppEvent::Changed(msg) => {
            state.message = msg;
            state.loading = true;
            return Some(Action::Refresh(state.session.begin_fetch()));
        }
        AppEvent::Saved(msg) => {
            state.pending_form = None;
            state.message = msg;
            state.loading = true;
            return Some(Action::Refresh(state.session.begin_fetch()));
        }
        AppEvent::SaveFailed(msg) => {
            state.loading = false;
            match state.pending_form.take() {
                Some((edit_id, mut form)) => {
                    form.error = Some(msg);
                    state.modal = Some(match edit_id {
                        Some(id) => Modal::EditTask(id, form),
                        None => Modal::AddTask(form),
                    });
                }
                None => state.show_alert(format!("Error: {}", msg)),
            }
        }
        AppEvent::Failed(msg) => {
            state.loading = false;
            state.show_alert(format!("Error: {}", msg));
        }
        AppEvent::Synced(result) => {
            state.message = match result {
                Ok(msg) => msg,
                Err(e) => format!("Sync failed: {}", e),
            };
            return Some(Action::Refresh(state.session.begin_fetch()));
        }
        AppEvent::SettingsLoaded(settings) => {
            if let Some(Modal::Settings(form)) = state.modal.as_mut() {
                form.fill(&settings);
            }
        }
        AppEvent::SettingsSaved(msg) => state.show_alert(msg),
        AppEvent::AiReplied { loading_id, result } => {
            state.session.chat_mut().resolve(&loading_id, result);
        }
        AppEvent::Push(push) => match push {
            PushEvent::NotesUpdated(tasks) => {
                state.session.apply_push(tasks, Utc::now());
                state.loading = false;
                state.clamp_selection();
                state.message = "Board updated.".to_string();
            }
            PushEvent::Connected => state.push_connected = true,
            PushEvent::Disconnected(reason) => {
                state.push_connected = false;
                tracing::debug!(%reason, "push offline");
            }
        },
    }
    None
}

/// Runs a board command produced by a click or its keyboard equivalent.
fn run_command(state: &mut AppState, command: BoardCommand) -> Option<Action> {
    match command {
        BoardCommand::Complete(id) => {
            state.message = "Completing...".to_string();
            Some(Action::CompleteTask(id))
        }
        BoardCommand::Delete(id) => {
            if state.confirm_delete {
                state.modal = Some(Modal::ConfirmDelete(id));
                None
            } else {
                state.message = "Deleting...".to_string();
                Some(Action::DeleteTask(id))
            }
        }
        BoardCommand::OpenDetail(id) => {
            state.modal = Some(Modal::ViewTask(id));
            None
        }
        BoardCommand::AddTask => {
            state.modal = Some(Modal::AddTask(TaskForm::new()));
            None
        }
    }
}

fn click_selected(state: &mut AppState, target: CardTarget) -> Option<Action> {
    let command = state.selected_card()?.click(target)?;
    run_command(state, command)
}

fn toggle_theme(state: &mut AppState) {
    let theme = state.session.theme().toggled();
    state.session.set_theme(theme, Utc::now());
    if let Err(e) = (Preferences { theme }).save() {
        tracing::warn!(error = %e, "could not save preferences");
    }
    state.message = format!("Theme: {}", theme);
}

fn open_settings(state: &mut AppState) -> Option<Action> {
    state.modal = Some(Modal::Settings(SettingsForm::new()));
    Some(Action::LoadSettings)
}

fn copy_code(state: &mut AppState, code: Option<String>) {
    let Some(code) = code else {
        state.message = "No code block to copy.".to_string();
        return;
    };
    state.message = match clipboard::copy(&code) {
        Ok(()) => "Copied!".to_string(),
        Err(e) => format!("Copy failed: {}", e),
    };
}

fn send_prompt(state: &mut AppState) -> Option<Action> {
    let prompt = state.ai_input.buffer.trim().to_string();
    if prompt.is_empty() {
        return None;
    }
    let context = state.session.ai_context();
    let chat = state.session.chat_mut();
    chat.push_user(&prompt);
    let loading_id = chat.push_loading();
    state.ai_input.reset();
    Some(Action::AskAi {
        prompt,
        context,
        loading_id,
    })
}

fn fill_suggestion(state: &mut AppState, index: usize) {
    if state.session.ai_selection().is_none() {
        return;
    }
    if let Some((_, prompt)) = SUGGESTIONS.get(index) {
        state.ai_input.set(prompt);
    }
}

/// Submits an add/edit form. Invalid input keeps the form open with the
/// reason shown inline.
fn submit_task_form(state: &mut AppState, edit_id: Option<String>, mut form: TaskForm) -> Option<Action> {
    let fields = form.to_fields();
    if let Err(e) = fields.validate() {
        form.error = Some(e.to_string());
        state.modal = Some(match edit_id {
            Some(id) => Modal::EditTask(id, form),
            None => Modal::AddTask(form),
        });
        return None;
    }
    form.error = None;
    state.message = "Saving...".to_string();
    state.pending_form = Some((edit_id.clone(), form));
    Some(match edit_id {
        Some(id) => Action::UpdateTask(id, fields.trimmed()),
        None => Action::CreateTask(fields.trimmed()),
    })
}

fn handle_form_key(key: KeyEvent, form: &mut TaskForm) {
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.previous_field(),
        KeyCode::Char(c) => form.focused_mut().enter_char(c),
        KeyCode::Backspace => form.focused_mut().delete_char(),
        KeyCode::Left => form.focused_mut().move_cursor_left(),
        KeyCode::Right => form.focused_mut().move_cursor_right(),
        _ => {}
    }
}

fn handle_modal_key(key: KeyEvent, state: &mut AppState, modal: Modal) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match modal {
        Modal::Alert(text) => match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => {}
            _ => state.modal = Some(Modal::Alert(text)),
        },

        Modal::ConfirmDelete(id) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                state.message = "Deleting...".to_string();
                return Some(Action::DeleteTask(id));
            }
            KeyCode::Char('n') | KeyCode::Esc => {}
            _ => state.modal = Some(Modal::ConfirmDelete(id)),
        },

        Modal::ViewTask(id) => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {}
            KeyCode::Char('e') => {
                if let Some(task) = state.session.task(&id)
                    && !task.status.is_done()
                {
                    state.modal = Some(Modal::EditTask(id.clone(), TaskForm::from_task(task)));
                } else {
                    state.modal = Some(Modal::ViewTask(id));
                }
            }
            KeyCode::Char('c') => return run_command(state, BoardCommand::Complete(id)),
            KeyCode::Char('d') => return run_command(state, BoardCommand::Delete(id)),
            _ => state.modal = Some(Modal::ViewTask(id)),
        },

        Modal::AddTask(mut form) => match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter if form.is_last_field() => return submit_task_form(state, None, form),
            KeyCode::Enter => {
                form.next_field();
                state.modal = Some(Modal::AddTask(form));
            }
            KeyCode::Char('s') if ctrl => return submit_task_form(state, None, form),
            _ => {
                handle_form_key(key, &mut form);
                state.modal = Some(Modal::AddTask(form));
            }
        },

        Modal::EditTask(id, mut form) => match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter if form.is_last_field() => {
                return submit_task_form(state, Some(id), form);
            }
            KeyCode::Enter => {
                form.next_field();
                state.modal = Some(Modal::EditTask(id, form));
            }
            KeyCode::Char('s') if ctrl => return submit_task_form(state, Some(id), form),
            _ => {
                handle_form_key(key, &mut form);
                state.modal = Some(Modal::EditTask(id, form));
            }
        },

        Modal::Settings(mut form) => match key.code {
            KeyCode::Esc => {}
            KeyCode::Char('t') if ctrl => {
                toggle_theme(state);
                state.modal = Some(Modal::Settings(form));
            }
            KeyCode::Enter if form.focus == 1 || ctrl => {
                state.message = "Saving settings...".to_string();
                return Some(Action::SaveSettings(form.to_settings()));
            }
            KeyCode::Enter | KeyCode::Tab | KeyCode::Down | KeyCode::BackTab | KeyCode::Up => {
                form.focus = 1 - form.focus;
                state.modal = Some(Modal::Settings(form));
            }
            _ => {
                let field = &mut form.fields[form.focus];
                match key.code {
                    KeyCode::Char(c) => field.enter_char(c),
                    KeyCode::Backspace => field.delete_char(),
                    KeyCode::Left => field.move_cursor_left(),
                    KeyCode::Right => field.move_cursor_right(),
                    _ => {}
                }
                state.modal = Some(Modal::Settings(form));
            }
        },

        Modal::SelectTask(mut list) => {
            let ids = state.selector_ids();
            match key.code {
                KeyCode::Esc => {}
                KeyCode::Enter => {
                    if let Some(id) = list.selected().and_then(|i| ids.get(i))
                        && state.session.select_for_ai(id)
                    {
                        state.message = "Task selected as context.".to_string();
                    }
                }
                KeyCode::Down | KeyCode::Char('j') if !ids.is_empty() => {
                    let i = list.selected().map_or(0, |i| (i + 1) % ids.len());
                    list.select(Some(i));
                    state.modal = Some(Modal::SelectTask(list));
                }
                KeyCode::Up | KeyCode::Char('k') if !ids.is_empty() => {
                    let i = list
                        .selected()
                        .map_or(0, |i| if i == 0 { ids.len() - 1 } else { i - 1 });
                    list.select(Some(i));
                    state.modal = Some(Modal::SelectTask(list));
                }
                _ => state.modal = Some(Modal::SelectTask(list)),
            }
        }
    }
    None
}

fn handle_ai_key(key: KeyEvent, state: &mut AppState) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => state.open_page(Page::Board),
        KeyCode::Enter => return send_prompt(state),
        KeyCode::Char('t') if ctrl => {
            let mut list = ListState::default();
            if !state.selector_ids().is_empty() {
                list.select(Some(0));
            }
            state.modal = Some(Modal::SelectTask(list));
        }
        KeyCode::Char('x') if ctrl => {
            state.session.clear_ai_selection();
            state.message = "Context cleared.".to_string();
        }
        KeyCode::Char('y') if ctrl => {
            let code = state.session.chat().latest_code_block().map(str::to_string);
            copy_code(state, code);
        }
        KeyCode::Char(c @ '1'..='4') if key.modifiers.contains(KeyModifiers::ALT) => {
            fill_suggestion(state, c as usize - '1' as usize);
        }
        KeyCode::Char(c) => state.ai_input.enter_char(c),
        KeyCode::Backspace => state.ai_input.delete_char(),
        KeyCode::Left => state.ai_input.move_cursor_left(),
        KeyCode::Right => state.ai_input.move_cursor_right(),
        KeyCode::PageUp | KeyCode::Up => state.session.chat_mut().scroll_up(3),
        KeyCode::PageDown | KeyCode::Down => state.session.chat_mut().scroll_down(3),
        KeyCode::End => state.session.chat_mut().scroll_to_bottom(),
        KeyCode::Tab => state.open_page(state.page.next()),
        _ => {}
    }
    None
}

pub fn handle_key_event(key: KeyEvent, state: &mut AppState) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }
    if let Some(modal) = state.modal.take() {
        return handle_modal_key(key, state, modal);
    }
    if state.page == Page::AskAi {
        return handle_ai_key(key, state);
    }

    match key.code {
        KeyCode::Char('q') => return Some(Action::Quit),
        KeyCode::Char('1') => state.open_page(Page::Board),
        KeyCode::Char('2') => state.open_page(Page::Calendar),
        KeyCode::Char('3') => state.open_page(Page::AskAi),
        KeyCode::Tab => state.open_page(state.page.next()),
        KeyCode::Char('t') => toggle_theme(state),
        KeyCode::Char(',') => return open_settings(state),
        KeyCode::Char('r') => {
            state.loading = true;
            state.message = "Refreshing...".to_string();
            return Some(Action::Refresh(state.session.begin_fetch()));
        }
        KeyCode::Char('s') => {
            state.loading = true;
            state.message = "Syncing...".to_string();
            return Some(Action::Sync);
        }
        _ => {}
    }

    match state.page {
        Page::Board => match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
                state.toggle_column()
            }
            KeyCode::Down | KeyCode::Char('j') => state.next(),
            KeyCode::Up | KeyCode::Char('k') => state.previous(),
            KeyCode::Enter => return click_selected(state, CardTarget::Body),
            KeyCode::Char('c') | KeyCode::Char(' ') => {
                return click_selected(state, CardTarget::Action(CardAction::Complete));
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                return click_selected(state, CardTarget::Action(CardAction::Delete));
            }
            KeyCode::Char('a') => return run_command(state, BoardCommand::AddTask),
            KeyCode::Char('e') => {
                if let Some(card) = state.selected_card()
                    && !card.completed
                    && let Some(task) = state.session.task(&card.id)
                {
                    state.modal = Some(Modal::EditTask(task.id.clone(), TaskForm::from_task(task)));
                }
            }
            _ => {}
        },
        Page::Calendar => {
            let today = Utc::now().with_timezone(&chrono::Local).date_naive();
            let calendar = state.session.calendar_mut();
            match key.code {
                KeyCode::Left | KeyCode::Char('h') => calendar.prev_month(today),
                KeyCode::Right | KeyCode::Char('l') => calendar.next_month(today),
                KeyCode::Char('T') | KeyCode::Char('g') => calendar.go_to_today(today),
                _ => {}
            }
        }
        Page::AskAi => {}
    }
    None
}

fn handle_click(state: &mut AppState, hitbox: Hitbox, x: u16, y: u16) -> Option<Action> {
    match hitbox.target {
        HitTarget::Tab(page) => state.open_page(page),
        HitTarget::AddButton => return run_command(state, BoardCommand::AddTask),
        HitTarget::Suggestion(i) => fill_suggestion(state, i),
        HitTarget::CopyButton { message, block } => {
            let code = state
                .session
                .chat()
                .messages()
                .get(message)
                .and_then(|m| m.content.code_blocks().get(block))
                .map(|b| b.content.clone());
            if code.is_some() {
                state.mark_copied(message, block);
            }
            copy_code(state, code);
        }
        HitTarget::Card { bucket, index } => {
            state.select_card(bucket, index);
            let inner = hitbox.inner;
            let card = state.card_at(bucket, index)?;
            let target = if x >= inner.x && y >= inner.y {
                card.hit_test(x - inner.x, y - inner.y, inner.width)
            } else {
                CardTarget::Body
            };
            let command = card.click(target)?;
            return run_command(state, command);
        }
    }
    None
}

pub fn handle_mouse_event(mouse: MouseEvent, state: &mut AppState) -> Option<Action> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if state.modal.is_some() {
                return None;
            }
            let hitbox = state.hit(mouse.column, mouse.row)?;
            handle_click(state, hitbox, mouse.column, mouse.row)
        }
        MouseEventKind::ScrollDown => {
            match state.page {
                Page::AskAi => state.session.chat_mut().scroll_down(1),
                _ => state.next(),
            }
            None
        }
        MouseEventKind::ScrollUp => {
            match state.page {
                Page::AskAi => state.session.chat_mut().scroll_up(1),
                _ => state.previous(),
            }
            None
        }
        _ => None,
    }
}
