use anyhow::{Result, anyhow};
use console::{Key, Term};
use dialoguer::Input;

#[derive(Debug, PartialEq)]
pub enum MenuChoice {
    Back,
    Quit,
    Index(usize),
}

const HELP: &str = "Number + Enter, or arrows + Enter. Tab = next section, 'b' = back, 'q' = quit.";

/// Show a numbered list and read a choice. The first key picks the mode:
/// arrow keys start cursor navigation, anything else starts text entry.
pub fn prompt_index(
    prompt: &str,
    labels: &[String],
    header: &[String],
    section_starts: &[usize],
) -> Result<MenuChoice> {
    let term = Term::stdout();
    let _ = term.clear_screen();
    for line in header {
        println!("{}", line);
    }
    println!("{}", prompt);
    for (i, it) in labels.iter().enumerate() {
        println!("{}: {}", i + 1, it);
    }
    println!("{}", HELP);

    let initial = match term.read_key()? {
        Key::ArrowUp
        | Key::ArrowDown
        | Key::Home
        | Key::End
        | Key::PageUp
        | Key::PageDown
        | Key::Tab => {
            return cursor_select(&term, prompt, labels, header, section_starts);
        }
        Key::Char('q') | Key::Char('Q') => return Ok(MenuChoice::Quit),
        Key::Char('b') | Key::Char('B') | Key::Escape => return Ok(MenuChoice::Back),
        Key::Char(c) if !c.is_control() => c.to_string(),
        _ => String::new(),
    };
    let input: String = Input::new()
        .with_prompt("Selection")
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()?;
    parse_selection(&input, labels.len())
}

pub fn parse_selection(input: &str, len: usize) -> Result<MenuChoice> {
    let s = input.trim();
    if s.eq_ignore_ascii_case("q") {
        return Ok(MenuChoice::Quit);
    }
    if s.is_empty() || s.eq_ignore_ascii_case("b") {
        return Ok(MenuChoice::Back);
    }
    let idx: usize = s.parse().map_err(|_| anyhow!("invalid selection: {}", s))?;
    if idx == 0 || idx > len {
        return Err(anyhow!("selection out of range: {}", idx));
    }
    Ok(MenuChoice::Index(idx - 1))
}

/// Cursor position plus the first visible row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
    sel: usize,
    top: usize,
}

impl Cursor {
    fn step(mut self, key: &Key, len: usize, rows: usize, section_starts: &[usize]) -> Self {
        let last = len.saturating_sub(1);
        let page = rows.saturating_sub(1).max(1);
        self.sel = match key {
            Key::ArrowUp => self.sel.saturating_sub(1),
            Key::ArrowDown => (self.sel + 1).min(last),
            Key::Home => 0,
            Key::End => last,
            Key::PageUp => self.sel.saturating_sub(page),
            Key::PageDown => (self.sel + page).min(last),
            // next section, wrapping to the first
            Key::Tab => section_starts
                .iter()
                .copied()
                .find(|&i| i > self.sel)
                .or_else(|| section_starts.first().copied())
                .unwrap_or(self.sel)
                .min(last),
            _ => self.sel,
        };
        if self.sel < self.top {
            self.top = self.sel;
        } else if self.sel >= self.top + rows {
            self.top = self.sel + 1 - rows;
        }
        self
    }
}

fn cursor_select(
    term: &Term,
    prompt: &str,
    labels: &[String],
    header: &[String],
    section_starts: &[usize],
) -> Result<MenuChoice> {
    let mut cur = Cursor { sel: 0, top: 0 };
    loop {
        term.clear_screen()?;
        for line in header {
            println!("{}", line);
        }
        println!("{}", prompt);

        let (rows, _cols) = term.size();
        let rows = (rows as usize)
            .saturating_sub(header.len() + 2)
            .max(3)
            .min(labels.len().max(1));
        cur = cur.step(&Key::Unknown, labels.len(), rows, section_starts);

        for (i, label) in labels.iter().enumerate().skip(cur.top).take(rows) {
            let marker = if i == cur.sel { ">" } else { " " };
            println!("{} {}: {}", marker, i + 1, label);
        }
        println!("{}", HELP);

        match term.read_key()? {
            Key::Enter if !labels.is_empty() => return Ok(MenuChoice::Index(cur.sel)),
            Key::Char('q') | Key::Char('Q') => return Ok(MenuChoice::Quit),
            Key::Char('b') | Key::Char('B') | Key::Escape => return Ok(MenuChoice::Back),
            key => cur = cur.step(&key, labels.len(), rows, section_starts),
        }
    }
}
