use bytes::Bytes;
use serde_json::json;
use ticket_booking_config::StoreConfig;
use ticket_booking_store::schema::booking;
use ticket_booking_store::{
    connect, DocumentLibrary as _, Filter, ListStore as _, PeopleService as _, Query, StoreError,
};

#[tokio::test]
async fn offline_sites_work_in_memory() -> Result<(), StoreError> {
    let site = connect(&StoreConfig::default())?;

    let url = site
        .documents
        .upload(
            "/sites/TenantPracticeSite/Shared Documents",
            "voter-id.jpg",
            Bytes::from_static(b"jpeg"),
            true,
        )
        .await?;
    assert_eq!(url, "/sites/TenantPracticeSite/Shared Documents/voter-id.jpg");

    let mut fields = ticket_booking_store::Item::new();
    fields.insert(booking::TITLE.to_owned(), json!("Alice Smith"));
    fields.insert(booking::EMAIL.to_owned(), json!("alice@example.org"));
    let created = site.lists.add("BusTicketBooking", fields).await?;
    let id = created[booking::ID]
        .as_u64()
        .ok_or(StoreError::MissingField(booking::ID))?;

    let query = Query::new()
        .filter(Filter::eq(booking::EMAIL, "alice@example.org"))
        .select([booking::ID, booking::TITLE]);
    let found = site.lists.filter("BusTicketBooking", &query).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0][booking::TITLE], json!("Alice Smith"));

    site.lists.delete("BusTicketBooking", id).await?;
    assert!(site
        .lists
        .filter("BusTicketBooking", &query)
        .await?
        .is_empty());

    assert!(matches!(
        site.people.ensure_user("Nobody Known").await,
        Err(StoreError::UserNotFound(_))
    ));
    Ok(())
}

#[test]
fn online_sites_need_an_absolute_url() {
    let config = StoreConfig {
        site_url: "not a url".to_owned(),
        offline: false,
        ..StoreConfig::default()
    };
    assert!(matches!(connect(&config), Err(StoreError::InvalidUrl(_))));
}
