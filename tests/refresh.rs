use chrono::{Datelike, NaiveDate, Weekday};
use civcal::calendar::{Category, ScrapingMethod, SourceConfig};
use civcal::fetcher::{Fetcher, FetcherConfig};
use civcal::model::Client;
use civcal::model::mock_model::MockCompletionModel;
use civcal::pipeline::{Pipeline, PipelineConfig, ProgressEvent};
use futures::StreamExt;
use mockito::Server;

const LISTING_PAGE: &str = r#"<html><body>
    <nav>Home | About</nav>
    <main>
        <div class="event"><a href="/events/art-walk">First Friday Art Walk</a></div>
        <div class="event">Spring Festival, April 18</div>
        <div class="event">2026 Annual Spring Festival at Drexel Park</div>
    </main>
</body></html>"#;

const DETAIL_PAGE: &str = r#"<html><body><main>
    <h2>First Friday Art Walk</h2><p>6:00 PM, Downtown galleries</p>
    <h2>Blues Brunch</h2><p>March 22, 11:00 AM</p>
</main></body></html>"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
}

#[tokio::test]
async fn test_two_stage_refresh_expands_and_deduplicates() {
    let mut server = Server::new_async().await;
    let listing = server
        .mock("GET", "/events")
        .with_status(200)
        .with_body(LISTING_PAGE)
        .expect(1)
        .create_async()
        .await;
    let detail = server
        .mock("GET", "/events/art-walk")
        .with_status(200)
        .with_body(DETAIL_PAGE)
        .expect(1)
        .create_async()
        .await;

    let model = MockCompletionModel::new();
    model
        .push_text_response(
            r#"[
                {"title": "First Friday Art Walk", "url": "/events/art-walk"},
                {"title": "Spring Festival", "date": "2026-04-18", "location": "Drexel Park"},
                {"title": "2026 Annual Spring Festival", "date": "2026-04-18", "description": "Food and music"},
                {"title": "Read More"}
            ]"#,
        )
        .await;
    model
        .push_text_response(
            r#"```json
            [
                {"title": "Blues Brunch", "date": "2026-03-22", "time": "11:00 AM"},
                {"title": "First Friday Art Walk", "date": "2026-03-06", "time": "6:00 PM", "location": "Downtown galleries"}
            ]
            ```"#,
        )
        .await;

    let fetcher = Fetcher::new(FetcherConfig::builder().timeout_secs(5).build()).unwrap();
    let config = PipelineConfig::builder().today(today()).build();
    let pipeline = Pipeline::with_extractor(fetcher, Client::new(model.clone()).extractor(), config);

    let sources = vec![SourceConfig::new(
        "Main Street",
        format!("{}/events", server.url()),
        Category::Events,
        ScrapingMethod::AiTwostage,
    )];

    let events: Vec<ProgressEvent> = pipeline.run(Category::Events, &sources).collect().await;
    assert_eq!(events.first(), Some(&ProgressEvent::Init { total: 1 }));
    assert_eq!(events.last(), Some(&ProgressEvent::Complete));
    assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Error { .. })));

    let items = events
        .iter()
        .find_map(|e| match e {
            ProgressEvent::Items { items, .. } => Some(items.clone()),
            _ => None,
        })
        .expect("items event");

    let walks: Vec<_> = items
        .iter()
        .filter(|i| i.title == "First Friday Art Walk")
        .collect();
    let dates: Vec<NaiveDate> = walks.iter().map(|i| i.date()).collect();
    assert_eq!(dates.first(), NaiveDate::from_ymd_opt(2026, 3, 6).as_ref());
    assert!(dates.len() >= 5);
    assert!(dates.iter().all(|d| d.weekday() == Weekday::Fri && d.day() <= 7));
    assert!(walks.iter().all(|i| i.start.format("%H:%M").to_string() == "18:00"));
    assert!(walks.iter().all(|i| i.location.as_deref() == Some("Downtown galleries")));
    assert!(walks.iter().all(|i| i.recurring_pattern.as_deref() == Some("first friday")));
    assert!(walks.iter().all(|i| i.url.ends_with("/events/art-walk")));

    // The sibling on the detail page never becomes an item
    assert!(!items.iter().any(|i| i.title == "Blues Brunch"));
    assert!(!items.iter().any(|i| i.title == "Read More"));

    let festivals: Vec<_> = items
        .iter()
        .filter(|i| i.title.contains("Spring Festival"))
        .collect();
    assert_eq!(festivals.len(), 1);
    assert_eq!(festivals[0].title, "Spring Festival");
    assert_eq!(festivals[0].location.as_deref(), Some("Drexel Park"));
    assert_eq!(festivals[0].description.as_deref(), Some("Food and music"));
    assert_eq!(festivals[0].start.format("%H:%M").to_string(), "12:00");

    assert_eq!(model.calls(), 2);
    listing.assert_async().await;
    detail.assert_async().await;
}

#[tokio::test]
async fn test_refresh_all_runs_each_category_over_its_own_sources() {
    let mut server = Server::new_async().await;
    let _classes = server
        .mock("GET", "/classes")
        .with_status(200)
        .with_body(
            r#"<div class="class-item"><h3>Wheel Throwing</h3><span class="date">March 3, 2026 6:00 PM</span>
            <p>Instructor: Jane Smith</p></div>"#,
        )
        .create_async()
        .await;
    let _meetings = server
        .mock("GET", "/meetings")
        .with_status(404)
        .create_async()
        .await;

    let fetcher = Fetcher::new(FetcherConfig::builder().timeout_secs(5).build()).unwrap();
    let pipeline = Pipeline::without_extractor(fetcher, PipelineConfig::builder().today(today()).build());
    let sources = vec![
        SourceConfig::new("Arts Center", format!("{}/classes", server.url()), Category::Classes, ScrapingMethod::Auto),
        SourceConfig::new("City Clerk", format!("{}/meetings", server.url()), Category::Meetings, ScrapingMethod::Auto),
    ];

    let summaries = pipeline.refresh_all(&sources).await;
    assert_eq!(summaries.len(), 3);

    let events = &summaries[0];
    assert_eq!(events.category, Category::Events);
    assert_eq!(events.total, 0);

    let classes = &summaries[1];
    assert_eq!(classes.total, 1);
    assert!(classes.errors.is_empty());
    assert_eq!(classes.items.len(), 1);
    assert_eq!(classes.items[0].title, "Wheel Throwing");
    assert_eq!(classes.items[0].category(), Category::Classes);

    let meetings = &summaries[2];
    assert_eq!(meetings.total, 1);
    assert_eq!(meetings.errors.len(), 1);
    assert_eq!(meetings.errors[0].0, "City Clerk");
    assert!(meetings.items.is_empty());
}
