use chrono::{DateTime, TimeZone, Utc};
use duedeck::board::{BoardCommand, BoardState, BoardView, Bucket, CardAction, CardTarget};
use duedeck::client::ApiClient;
use duedeck::markup::LineKind;
use duedeck::model::{Task, TaskStatus};
use duedeck::prefs::Theme;
use duedeck::session::ClientSession;
use duedeck::stream::{MessageContent, Reveal};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn task(id: &str, status: TaskStatus, date: &str) -> Task {
    let mut t = Task::new(id, &format!("Task {}", id), status);
    t.description = format!("Details for {}", id);
    t.deadline_timestamp = now().timestamp() + 86_400;
    t.deadline_date = Some(date.to_string());
    t.deadline_display = date.to_string();
    t
}

fn ready(session: &ClientSession) -> &BoardView {
    match session.board() {
        BoardState::Ready(view) => view,
        other => panic!("board not ready: {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_then_refetch_rebuilds_board() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", "/api/notes/3")
        .with_status(200)
        .with_body(r#"{"message": "deleted"}"#)
        .create_async()
        .await;
    let list = server
        .mock("GET", "/api/notes")
        .with_status(200)
        .with_body(
            r#"[{"id":"1","mata_kuliah":"A","status":"pending","deadline_timestamp":4102444800},
                {"id":"2","mata_kuliah":"B","status":"completed","deadline_timestamp":0}]"#,
        )
        .create_async()
        .await;

    let client = ApiClient::new(&server.url()).unwrap();
    let mut session = ClientSession::new(Theme::Light, 3, now());
    session.apply_push(
        vec![
            task("1", TaskStatus::Pending, "2024-03-02"),
            task("2", TaskStatus::Completed, "2024-03-03"),
            task("3", TaskStatus::Pending, "2024-03-04"),
        ],
        now(),
    );
    assert_eq!(ready(&session).card_count(), 3);

    // Click the delete action on card 3, then run what it asks for.
    let (_, card) = ready(&session).find_card("3").unwrap();
    let command = card.click(CardTarget::Action(CardAction::Delete)).unwrap();
    assert_eq!(command, BoardCommand::Delete("3".into()));
    client.delete_task("3").await.unwrap();

    let ticket = session.begin_fetch();
    let result = client.list_tasks().await;
    assert!(session.apply_fetch(ticket, result, now()));

    delete.assert_async().await;
    list.assert_async().await;
    let view = ready(&session);
    assert_eq!(view.card_count(), 2);
    assert!(view.find_card("3").is_none());
    assert_eq!(view.column(Bucket::Upcoming).count, 1);
    assert_eq!(view.column(Bucket::Completed).count, 1);
}

#[test]
fn test_push_moves_card_and_drops_calendar_event() {
    let mut session = ClientSession::new(Theme::Dark, 3, now());
    session.apply_push(
        vec![
            task("1", TaskStatus::Pending, "2024-03-05"),
            task("2", TaskStatus::Notified, "2024-03-06"),
        ],
        now(),
    );
    assert_eq!(session.calendar().events().len(), 2);
    assert_eq!(ready(&session).column(Bucket::Upcoming).count, 2);

    session.apply_push(
        vec![
            task("1", TaskStatus::Completed, "2024-03-05"),
            task("2", TaskStatus::Notified, "2024-03-06"),
        ],
        now(),
    );

    let view = ready(&session);
    let (bucket, card) = view.find_card("1").unwrap();
    assert_eq!(bucket, Bucket::Completed);
    assert!(card.completed);
    assert!(!card.opens_detail);
    assert_eq!(card.actions, vec![CardAction::Delete]);
    assert_eq!(session.calendar().events().len(), 1);
    assert_eq!(session.calendar().events()[0].task_id, "2");
}

#[test]
fn test_stale_fetch_is_discarded() {
    let mut session = ClientSession::new(Theme::Light, 3, now());
    let first = session.begin_fetch();
    let second = session.begin_fetch();

    assert!(session.apply_fetch(second, Ok(vec![task("new", TaskStatus::Pending, "2024-03-02")]), now()));
    assert!(!session.apply_fetch(first, Ok(vec![task("old", TaskStatus::Pending, "2024-03-02")]), now()));

    let view = ready(&session);
    assert!(view.find_card("new").is_some());
    assert!(view.find_card("old").is_none());
}

#[test]
fn test_reveal_tick_count_and_final_render() {
    let answer = "  Here is **bold** and code:\n\n```rust\nfn main() {}\n```\n\nand $x^2$.  ";
    let trimmed = answer.trim();
    let k = trimmed.chars().count();

    let prefixes: Vec<String> = Reveal::new(answer, 3).collect();
    assert_eq!(prefixes.len(), k.div_ceil(3));
    assert_eq!(prefixes.last().map(String::as_str), Some(trimmed));

    let mut content = MessageContent::for_reply(answer, Some("msg-4"), 3);
    assert!(content.is_streaming());
    content.finish();
    assert!(!content.is_streaming());

    let rich = content.rich();
    let text = rich.to_plain_string();
    assert!(text.contains("x²"), "{}", text);
    assert!(!text.contains('$'));
    assert_eq!(rich.code_blocks.len(), 1);
    assert_eq!(rich.code_blocks[0].content.trim_end(), "fn main() {}");
    assert!(
        rich.lines
            .iter()
            .any(|l| matches!(l.kind, LineKind::CopyButton(0)))
    );
}

#[test]
fn test_loading_and_error_replies_are_shown_verbatim() {
    let loading = MessageContent::for_reply("**Thinking**", Some("loading-1"), 3);
    assert!(!loading.is_streaming());
    assert_eq!(loading.rich().to_plain_string(), "**Thinking**");

    let error = MessageContent::for_reply("Error: *bad* request", Some("msg-9"), 3);
    assert!(!error.is_streaming());
    assert_eq!(error.rich().to_plain_string(), "Error: *bad* request");
}

#[test]
fn test_chat_resolves_placeholder_and_streams() {
    let mut session = ClientSession::new(Theme::Light, 2, now());
    let greeting = session.chat().len();

    session.chat_mut().push_user("hello");
    let loading = session.chat_mut().push_loading();
    assert_eq!(session.chat().len(), greeting + 2);

    session.chat_mut().resolve(&loading, Ok("abcde".into()));
    assert_eq!(session.chat().len(), greeting + 2);
    assert!(session.chat().messages().iter().all(|m| m.id != loading));

    let mut ticks = 0;
    while session.chat_mut().tick() {
        ticks += 1;
    }
    // Three prefixes plus the final swap.
    assert_eq!(ticks, 4);
    assert!(!session.chat().is_streaming());
}
