use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::app::App;
use crate::state::{Message, Role};

/// Light blue bubble behind the user's own messages
pub const USER_BG: Color = Color::Rgb(0xaa, 0xcc, 0xff);
/// Light grey bubble behind bot replies
pub const BOT_BG: Color = Color::Rgb(0xee, 0xee, 0xee);

fn bubble_style(role: Role) -> Style {
    let bg = match role {
        Role::User => USER_BG,
        Role::Bot => BOT_BG,
    };
    Style::default().bg(bg).fg(Color::Black)
}

fn bubble_alignment(role: Role) -> Alignment {
    match role {
        Role::User => Alignment::Right,
        Role::Bot => Alignment::Left,
    }
}

/// Lines for the transcript box. Alignment depends on the role only.
pub fn message_lines(messages: &[Message]) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in messages {
        let style = bubble_style(msg.role);
        let alignment = bubble_alignment(msg.role);

        for text_line in msg.text.split('\n') {
            lines.push(
                Line::from(Span::styled(format!(" {} ", text_line), style)).alignment(alignment),
            );
        }
        lines.push(Line::default());
    }

    lines
}

/// Horizontal scrolling for the input box.
///
/// Returns how many chars to skip from the front of the draft and the
/// display column of the cursor, keeping the cursor inside `width` columns.
/// Columns are terminal cells, so wide glyphs count double.
fn input_window(draft: &str, cursor: usize, width: usize) -> (usize, u16) {
    let before: Vec<char> = draft.chars().take(cursor).collect();
    let mut cursor_col: usize = before.iter().map(|c| c.width().unwrap_or(0)).sum();

    let mut skip = 0;
    while width > 0 && cursor_col >= width && skip < before.len() {
        cursor_col -= before[skip].width().unwrap_or(0);
        skip += 1;
    }

    (skip, cursor_col.min(u16::MAX as usize) as u16)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input row, footer
    let [header_area, transcript_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, transcript_area);
    render_input(app, frame, input_row);
    render_footer(frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.transcript_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let text = if app.messages.is_empty() && !app.is_waiting() {
        Text::from(Span::styled(
            "Type a message and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines = message_lines(&app.messages);

        if app.is_waiting() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    // Measure with the same wrapping the frame uses, then settle the scroll offset
    let body = Paragraph::new(text).wrap(Wrap { trim: false });
    let inner = block.inner(area);
    let rendered = body.line_count(inner.width).min(u16::MAX as usize) as u16;
    app.sync_scroll(rendered, inner.height);

    let transcript = body.block(block).scroll((app.scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, _gap, send_area] = Layout::horizontal([
        Constraint::Percentage(80),
        Constraint::Percentage(2),
        Constraint::Percentage(18),
    ])
    .areas(area);

    app.send_area = Some(send_area);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (skip, cursor_x) = input_window(&app.draft, app.cursor, inner_width);

    let visible_text: String = app.draft.chars().skip(skip).collect();

    let input = Paragraph::new(visible_text).block(input_block);
    frame.render_widget(input, input_area);

    frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));

    let button_style = if app.draft.is_empty() {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::Black).bg(Color::Cyan).bold()
    };
    let button = Paragraph::new("Send")
        .alignment(Alignment::Center)
        .style(button_style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(button, send_area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatClient;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn test_app(messages: Vec<Message>) -> App {
        let mut app = App::new(ChatClient::new("http://127.0.0.1:9"));
        app.messages = messages;
        app
    }

    fn draw(app: &mut App, width: u16, height: u16) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn row_text(buffer: &Buffer, y: u16) -> String {
        let width = buffer.area.width as usize;
        let start = y as usize * width;
        buffer.content[start..start + width]
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    /// Column where `needle` starts on the first row containing it
    fn locate(buffer: &Buffer, needle: &str) -> Option<(u16, u16)> {
        (0..buffer.area.height).find_map(|y| {
            let row = row_text(buffer, y);
            // Border glyphs are multi-byte, so count chars rather than bytes
            row.find(needle)
                .map(|byte_idx| (row[..byte_idx].chars().count() as u16, y))
        })
    }

    #[test]
    fn test_alignment_follows_role() {
        let messages = vec![
            Message::bot("welcome"),
            Message::user("first"),
            Message::user("second"),
            Message::bot("multi\nline"),
        ];
        let lines = message_lines(&messages);

        for line in lines.iter().filter(|l| !l.spans.is_empty()) {
            let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
            let expected = if text.contains("first") || text.contains("second") {
                Alignment::Right
            } else {
                Alignment::Left
            };
            assert_eq!(line.alignment, Some(expected), "line {:?}", text);
        }
    }

    #[test]
    fn test_bubble_colors() {
        let lines = message_lines(&[Message::user("u"), Message::bot("b")]);
        assert_eq!(lines[0].spans[0].style.bg, Some(USER_BG));
        assert_eq!(lines[2].spans[0].style.bg, Some(BOT_BG));
    }

    #[test]
    fn test_multiline_reply_splits_lines() {
        let lines = message_lines(&[Message::bot("one\ntwo")]);
        // Two text lines plus the spacer
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].spans[0].content, " two ");
    }

    #[test]
    fn test_render_places_user_right_and_bot_left() {
        let mut app = test_app(vec![Message::user("hello there"), Message::bot("hi human")]);
        let buffer = draw(&mut app, 60, 20);

        let (user_x, user_y) = locate(&buffer, "hello there").unwrap();
        let (bot_x, _) = locate(&buffer, "hi human").unwrap();

        // User bubble hugs the right border, bot bubble the left one
        let user_end = user_x as usize + "hello there".len();
        assert!((57..=58).contains(&user_end), "user text ends at {}", user_end);
        assert!(bot_x <= 2, "bot text starts at {}", bot_x);

        let cell = &buffer.content[(user_y as usize * 60) + user_x as usize];
        assert_eq!(cell.bg, USER_BG);
    }

    #[test]
    fn test_render_placeholder_and_thinking() {
        let mut app = test_app(Vec::new());
        let buffer = draw(&mut app, 60, 20);
        assert!(locate(&buffer, "Type a message").is_some());

        app.insert_char('x');
        app.submit();
        let buffer = draw(&mut app, 60, 20);
        assert!(locate(&buffer, "Type a message").is_none());
        assert!(locate(&buffer, "Thinking.").is_some());
    }

    #[test]
    fn test_render_records_hit_areas() {
        let mut app = test_app(Vec::new());
        draw(&mut app, 100, 30);

        let send = app.send_area.unwrap();
        assert_eq!(send.y, 26);
        assert_eq!(send.height, 3);
        assert!(send.x >= 80);

        let transcript = app.transcript_area.unwrap();
        assert_eq!(transcript.y, 1);
        assert_eq!(app.transcript_height, transcript.height - 2);
        assert_eq!(app.rendered_lines, 1); // placeholder row
    }

    #[test]
    fn test_render_shows_draft() {
        let mut app = test_app(Vec::new());
        for c in "draft text".chars() {
            app.insert_char(c);
        }
        let buffer = draw(&mut app, 60, 20);
        let (_, y) = locate(&buffer, "draft text").unwrap();
        assert_eq!(y, 17);
        assert!(locate(&buffer, "Send").is_some());
    }

    fn screen_text(buffer: &Buffer) -> String {
        (0..buffer.area.height)
            .map(|y| row_text(buffer, y))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Send a prompt and answer it, drawing after every step like the live loop does
    fn exchange(app: &mut App, prompt: &str, reply: &str) {
        for c in prompt.chars() {
            app.insert_char(c);
        }
        let submission = app.submit().unwrap();
        draw(app, 30, 20);
        app.receive_reply(submission.seq, Ok(reply.to_string()));
        draw(app, 30, 20);
    }

    #[test]
    fn test_newest_reply_visible_after_word_wrapped_history() {
        let mut app = test_app(Vec::new());
        for i in 0..5 {
            exchange(
                &mut app,
                &format!("q{}", i),
                "aaaaaaaaaaaaaaa bbbbbbbbbbbbbbb ccccccccccccccc",
            );
        }
        exchange(&mut app, "last one", "LASTREPLY");

        let screen = screen_text(&draw(&mut app, 30, 20));
        assert!(screen.contains("LASTREPLY"), "newest reply scrolled out:\n{}", screen);
        assert_eq!(app.scroll, app.max_scroll());
    }

    #[test]
    fn test_newest_reply_visible_after_wide_glyph_history() {
        let mut app = test_app(Vec::new());
        for i in 0..4 {
            exchange(&mut app, &format!("q{}", i), &"你好世界".repeat(6));
        }
        exchange(&mut app, "last one", "LASTREPLY");

        let screen = screen_text(&draw(&mut app, 30, 20));
        assert!(screen.contains("LASTREPLY"), "newest reply scrolled out:\n{}", screen);
    }

    #[test]
    fn test_scrolled_back_view_stays_put_until_next_message() {
        let mut app = test_app(Vec::new());
        for i in 0..6 {
            exchange(&mut app, &format!("q{}", i), "short reply");
        }
        app.scroll_up(4);
        let held = app.scroll;

        app.tick_animation();
        draw(&mut app, 30, 20);
        assert_eq!(app.scroll, held);

        exchange(&mut app, "again", "FRESH");
        let screen = screen_text(&draw(&mut app, 30, 20));
        assert!(screen.contains("FRESH"));
    }

    #[test]
    fn test_input_window_ascii() {
        assert_eq!(input_window("hello", 5, 10), (0, 5));
        assert_eq!(input_window("hello", 2, 10), (0, 2));
        // Cursor past the box scrolls the text left
        assert_eq!(input_window("abcdefghij", 10, 4), (7, 3));
        assert_eq!(input_window("", 0, 0), (0, 0));
    }

    #[test]
    fn test_input_window_wide_glyphs() {
        // Each ideograph takes two cells
        assert_eq!(input_window("你好x", 2, 20), (0, 4));
        assert_eq!(input_window("你好x", 3, 20), (0, 5));
        assert_eq!(input_window("你好世界", 4, 5), (2, 4));
    }
}
