use chrono::{Duration, NaiveDate};
use rental_match::models::{
    Address, IdentityInput, IssueCategory, IssuePriority, LandlordOnboarding, OnboardingInput,
    PropertyInput, RaiseIssueInput, RenterOnboarding, RenterSituation,
};
use rental_match::storage::JsonFileAdapter;
use rental_match::{telemetry, Config, LikeOutcome, Store};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    telemetry::init(config.log_level);

    info!("🏠 Rental Match - demo walkthrough");
    info!("==================================");

    let move_in = NaiveDate::from_ymd_opt(2026, 11, 1).ok_or_else(|| anyhow::anyhow!("invalid move-in date"))?;
    let adapter = JsonFileAdapter::open(&config.data_dir).await?;
    let data_dir = config.data_dir.clone();
    let store = Store::new(adapter, config);

    if let Some(profile) = store.restore_session().await? {
        info!("Previous session belonged to {}", profile.display_name());
    }
    store.request_reset().confirm(&store).await?;

    let landlord = store
        .register(
            OnboardingInput::Landlord(LandlordOnboarding {
                identity: IdentityInput {
                    email: "priya@example.com".to_string(),
                    full_name: "Priya Shah".to_string(),
                    phone: None,
                },
                registration_number: Some("PRS-0042".to_string()),
                ombudsman_scheme: None,
                certifications: Default::default(),
            }),
            "landlord-demo-password",
        )
        .await?;

    let property_id = store
        .create_property(
            PropertyInput {
                address: Address {
                    street: "4 Hyde Park Road".to_string(),
                    city: "Leeds".to_string(),
                    postcode: "LS6 1AB".to_string(),
                    council: Some("Leeds City Council".to_string()),
                },
                rent_pcm: Some(850),
                deposit: 950,
                bedrooms: 2,
                bathrooms: 1,
                available_from: move_in,
                description: "Two-bed terrace a short walk from the park.".to_string(),
                ..Default::default()
            },
            landlord.id(),
        )
        .await?;

    let renter = store
        .register(
            OnboardingInput::Renter(RenterOnboarding {
                identity: IdentityInput {
                    email: "sam@example.com".to_string(),
                    full_name: "Sam Carter".to_string(),
                    phone: None,
                },
                monthly_income: Some(3000),
                ages: "28".to_string(),
                situation: RenterSituation::Single,
                preferred_move_in: None,
                has_pets: false,
            }),
            "renter-demo-password",
        )
        .await?;

    let deck = store.unseen_properties(renter.id()).await?;
    info!("Deck has {} properties", deck.len());

    let LikeOutcome::Matched(m) = store.handle_like(renter.id(), property_id).await? else {
        anyhow::bail!("expected the like to create a match");
    };
    info!("\n✅ Matched {} with property {}\n", renter.display_name(), property_id);

    store
        .send_message(m.conversation_id, renter.id(), "Hi! Could I view the house this weekend?")
        .await?;
    store.verify_right_to_rent(m.id, landlord.id()).await?;
    store
        .activate_tenancy(m.id, landlord.id(), move_in)
        .await?;

    let issue = store
        .raise_issue(
            renter.id(),
            RaiseIssueInput {
                match_id: m.id,
                category: IssueCategory::Safety,
                priority: IssuePriority::Emergency,
                subject: "Smell of gas".to_string(),
                description: "Strong smell of gas near the boiler cupboard.".to_string(),
                images: vec![],
            },
        )
        .await?;
    info!(
        "Issue '{}' due within {}h",
        issue.subject,
        (issue.sla_deadline - issue.raised_at).num_hours()
    );
    let later = store.now() + Duration::hours(5);
    info!("Overdue five hours from now: {}", later > issue.sla_deadline);

    for thread in store.threads(landlord.id()).await? {
        println!(
            "{} ({} unread): {}",
            thread.counterparty_name,
            thread.unread_count,
            thread.last_message.map(|m| m.body).unwrap_or_default()
        );
    }

    let overviews = store.match_overviews(landlord.id()).await?;
    let json = serde_json::to_string_pretty(&overviews)?;
    tokio::fs::write(data_dir.join("match_overviews.json"), json).await?;
    info!("💾 Saved {} match overviews to {}", overviews.len(), data_dir.display());

    let stats = store.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
