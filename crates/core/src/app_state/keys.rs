use indexmap::IndexSet;
use log::debug;

use super::types::{Action, AppMode, Key, SortMode, Update};
use super::AppState;

/// Cursor movement across the row-major grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Up,
    Down,
    Left,
    Right,
    First,
    Last,
}

fn movement_for(key: Key, vim_keys: bool) -> Option<Movement> {
    match key {
        Key::Up => Some(Movement::Up),
        Key::Down => Some(Movement::Down),
        Key::Left => Some(Movement::Left),
        Key::Right => Some(Movement::Right),
        Key::Home => Some(Movement::First),
        Key::End => Some(Movement::Last),
        Key::Char(c) if vim_keys => match c {
            'k' => Some(Movement::Up),
            'j' => Some(Movement::Down),
            'h' => Some(Movement::Left),
            'l' => Some(Movement::Right),
            'g' => Some(Movement::First),
            'G' => Some(Movement::Last),
            _ => None,
        },
        _ => None,
    }
}

/// Position 0-8 for the quick-select digits `1`-`9`.
fn quick_select_position(c: char) -> Option<usize> {
    match c {
        '1'..='9' => c.to_digit(10).map(|d| d as usize - 1),
        _ => None,
    }
}

impl AppState {
    /// Applies one key press and returns the new snapshot plus what the front
    /// end should do next.
    pub fn handle_key(&mut self, key: Key) -> Update {
        let action = if key == Key::Ctrl('c') {
            Some(Action::Quit)
        } else if self.terminal_too_small {
            matches!(key, Key::Char('q') | Key::Esc).then_some(Action::Quit)
        } else {
            match self.mode {
                AppMode::Normal => self.handle_normal_key(key),
                AppMode::Filter { .. } => self.handle_filter_key(key),
                AppMode::MultiSelect { .. } => self.handle_multi_select_key(key),
                AppMode::Args { .. } => self.handle_args_key(key),
                AppMode::WorkspaceSelect { .. } => self.handle_workspace_key(key),
                AppMode::Help | AppMode::Error { .. } => {
                    self.mode = AppMode::Normal;
                    None
                }
            }
        };

        Update {
            snapshot: self.snapshot(),
            action,
        }
    }

    fn move_cursor(&mut self, movement: Movement) {
        let len = self.visible_indices.len();
        let Some(current) = self.selected_index else {
            return;
        };
        let columns = self.column_count.max(1);
        let last = len - 1;

        let next = match movement {
            Movement::Up => current.checked_sub(columns).unwrap_or(current),
            Movement::Down if current + columns <= last => current + columns,
            // Drop into a shorter last row.
            Movement::Down if current / columns < last / columns => last,
            Movement::Down => current,
            Movement::Left => current.saturating_sub(1),
            Movement::Right => (current + 1).min(last),
            Movement::First => 0,
            Movement::Last => last,
        };
        self.selected_index = Some(next);
    }

    fn run_selected(&mut self) -> Option<Action> {
        let catalog_index = *self.visible_indices.get(self.selected_index?)?;
        let requests = self.requests_for(&[catalog_index]);
        self.run_action(requests)
    }

    fn set_query(&mut self, query: String) {
        self.mode = AppMode::Filter { query };
        self.recompute_visible(true);
    }

    fn handle_normal_key(&mut self, key: Key) -> Option<Action> {
        if let Some(movement) = movement_for(key, true) {
            self.move_cursor(movement);
            return None;
        }

        match key {
            Key::Enter => self.run_selected(),
            Key::Char(c) if quick_select_position(c).is_some() => {
                let position = quick_select_position(c)?;
                let catalog_index = *self.visible_indices.get(position)?;
                self.selected_index = Some(position);
                let requests = self.requests_for(&[catalog_index]);
                self.run_action(requests)
            }
            Key::Char('q') => Some(Action::Quit),
            Key::Char('/') => {
                self.set_query(String::new());
                None
            }
            Key::Char('?') => {
                self.mode = AppMode::Help;
                None
            }
            Key::Char('m') => {
                self.mode = AppMode::MultiSelect {
                    selected: IndexSet::new(),
                };
                None
            }
            Key::Char('s') => {
                self.sort_mode = self.sort_mode.next();
                debug!("Sort mode changed to {}", self.sort_mode);
                self.recompute_visible(false);
                None
            }
            Key::Char('a') => {
                self.include_lifecycle = !self.include_lifecycle;
                self.recompute_visible(false);
                None
            }
            Key::Char('r') => match self.rerun_last() {
                Ok(request) => Some(Action::Run(vec![request])),
                Err(e) => {
                    self.set_error(&e);
                    None
                }
            },
            Key::Char('R') => Some(Action::Refresh),
            Key::Char('A') => {
                let catalog_index = *self.visible_indices.get(self.selected_index?)?;
                self.mode = AppMode::Args {
                    catalog_index,
                    input: self.args_prefill(catalog_index),
                };
                None
            }
            Key::Char('w') if self.workspace.is_some() => {
                self.mode = AppMode::WorkspaceSelect {
                    cursor: self.current_choice(),
                };
                None
            }
            Key::Char(c) if !c.is_control() && !c.is_whitespace() => {
                self.set_query(c.to_string());
                None
            }
            _ => None,
        }
    }

    fn handle_filter_key(&mut self, key: Key) -> Option<Action> {
        let AppMode::Filter { query } = &self.mode else {
            return None;
        };
        let mut query = query.clone();

        if let Some(movement) = movement_for(key, false) {
            self.move_cursor(movement);
            return None;
        }

        match key {
            Key::Esc => {
                self.mode = AppMode::Normal;
                self.recompute_visible(true);
                None
            }
            Key::Enter => {
                // Nothing matched: stay in the filter.
                let selected = self.selected_index?;
                let catalog_index = *self.visible_indices.get(selected)?;
                let requests = self.requests_for(&[catalog_index]);
                self.mode = AppMode::Normal;
                self.recompute_visible(true);
                self.run_action(requests)
            }
            Key::Backspace if query.is_empty() => {
                self.mode = AppMode::Normal;
                self.recompute_visible(true);
                None
            }
            Key::Backspace => {
                query.pop();
                self.set_query(query);
                None
            }
            Key::Char(c) if !c.is_control() => {
                query.push(c);
                self.set_query(query);
                None
            }
            _ => None,
        }
    }

    fn handle_args_key(&mut self, key: Key) -> Option<Action> {
        let AppMode::Args {
            catalog_index,
            input,
        } = &mut self.mode
        else {
            return None;
        };

        match key {
            Key::Esc => {
                self.mode = AppMode::Normal;
                None
            }
            Key::Enter => {
                let catalog_index = *catalog_index;
                let args = std::mem::take(input);
                self.mode = AppMode::Normal;
                let args = Some(args.trim()).filter(|a| !a.is_empty());
                let request = self.request_for(catalog_index, args);
                self.run_action(request.map(|r| vec![r]))
            }
            Key::Backspace => {
                input.pop();
                None
            }
            Key::Char(c) if !c.is_control() => {
                input.push(c);
                None
            }
            _ => None,
        }
    }

    fn switch_to_choice(&mut self, choice: usize) -> Option<Action> {
        let choices = self.workspace_choices();
        let (_, manifest_path) = choices.get(choice)?;
        let current = self.current_choice();
        self.mode = AppMode::Normal;
        (choice != current).then(|| Action::SwitchProject(manifest_path.clone()))
    }

    fn handle_workspace_key(&mut self, key: Key) -> Option<Action> {
        let AppMode::WorkspaceSelect { cursor } = self.mode else {
            return None;
        };
        let last = self.workspace_choices().len().saturating_sub(1);

        if let Some(movement) = movement_for(key, true) {
            let next = match movement {
                Movement::Up | Movement::Left => cursor.saturating_sub(1),
                Movement::Down | Movement::Right => (cursor + 1).min(last),
                Movement::First => 0,
                Movement::Last => last,
            };
            self.mode = AppMode::WorkspaceSelect { cursor: next };
            return None;
        }

        match key {
            Key::Esc | Key::Char('w') => {
                self.mode = AppMode::Normal;
                None
            }
            Key::Char('q') => Some(Action::Quit),
            Key::Enter => self.switch_to_choice(cursor),
            Key::Char(c) if quick_select_position(c).is_some_and(|p| p <= last) => {
                let choice = quick_select_position(c)?;
                self.switch_to_choice(choice)
            }
            _ => None,
        }
    }

    fn toggle_marked(&mut self, position: usize) {
        let Some(catalog_index) = self.visible_indices.get(position).copied() else {
            return;
        };
        if let AppMode::MultiSelect { selected } = &mut self.mode {
            if !selected.shift_remove(&catalog_index) {
                selected.insert(catalog_index);
            }
        }
    }

    fn handle_multi_select_key(&mut self, key: Key) -> Option<Action> {
        if let Some(movement) = movement_for(key, true) {
            self.move_cursor(movement);
            return None;
        }

        match key {
            Key::Esc => {
                self.mode = AppMode::Normal;
                None
            }
            Key::Char('q') => Some(Action::Quit),
            Key::Char(' ') => {
                if let Some(position) = self.selected_index {
                    self.toggle_marked(position);
                }
                None
            }
            Key::Char(c) if quick_select_position(c).is_some() => {
                let position = quick_select_position(c)?;
                if position < self.visible_indices.len() {
                    self.selected_index = Some(position);
                    self.toggle_marked(position);
                }
                None
            }
            Key::Char('a') => {
                let visible = self.visible_indices.clone();
                if let AppMode::MultiSelect { selected } = &mut self.mode {
                    selected.extend(visible);
                }
                None
            }
            Key::Char('n') => {
                if let AppMode::MultiSelect { selected } = &mut self.mode {
                    selected.clear();
                }
                None
            }
            Key::Enter => {
                let AppMode::MultiSelect { selected } = &self.mode else {
                    return None;
                };
                if selected.is_empty() {
                    return None;
                }
                let order: Vec<usize> = selected.iter().copied().collect();
                let requests = self.requests_for(&order);
                self.mode = AppMode::Normal;
                self.run_action(requests)
            }
            _ => None,
        }
    }
}
