use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use flight_destinations::auth::{CredentialProvider, CredentialSource, OAuthTokenIssuer};
use flight_destinations::config::{API_KEY_VAR, API_SECRET_VAR, ApiConfig};
use flight_destinations::onboarding::{OnboardingProgress, OnboardingStore};
use flight_destinations::search::model::DEFAULT_CURRENCY;
use flight_destinations::search::{
    FlightOffer, FlightSearchClient, POPULAR_ORIGIN, QueryCoalescer, SearchResponse,
    SearchSession, build_http_client,
};

const ONBOARDING_STEPS: [&str; 3] = [
    "Your coffee journey starts here!",
    "Discover the perfect coffee spots around the world, for business or pleasure.",
    "Pick an origin airport and a date, and we'll show the cheapest places to fly.",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ApiConfig::from_env()?;
    let http = build_http_client(&config)?;

    let issuer = Arc::new(OAuthTokenIssuer::new(http.clone(), config.token_url.clone()));
    let credentials = Arc::new(CredentialProvider::new(CredentialSource::default(), issuer));
    let client = Arc::new(FlightSearchClient::with_http_client(
        http,
        &config,
        credentials,
    ));
    let session = SearchSession::new(
        Arc::new(QueryCoalescer::new(Arc::clone(&client))),
        config.debounce_delay,
    );

    let store = OnboardingStore::new(onboarding_path());
    let mut progress = store.load().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not read onboarding progress; starting over");
        OnboardingProgress::default()
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !progress.is_completed && !run_onboarding(&store, &mut progress, &mut lines).await? {
        return Ok(());
    }

    eprintln!("✈️  Flight destinations v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.base_url);
    if std::env::var(API_KEY_VAR).is_err() || std::env::var(API_SECRET_VAR).is_err() {
        eprintln!("   Warning: {API_KEY_VAR} / {API_SECRET_VAR} not set; searches will fail");
    }
    eprintln!("   Enter `ORIGIN [YYYYMMDD]`, an empty line for popular destinations");
    eprintln!("   from {POPULAR_ORIGIN}, /reset to replay onboarding, /quit to exit.\n");

    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "/quit" => break,
            "/reset" => {
                progress.reset();
                store.save(&progress).await?;
                eprintln!("Onboarding will run again on next launch.");
            }
            "" => match client.popular_destinations().await {
                Ok(offers) => {
                    println!("Popular destinations");
                    let offers: Vec<&FlightOffer> = offers.iter().collect();
                    render_offers(&offers, DEFAULT_CURRENCY, None);
                }
                Err(e) => eprintln!("❌ {e}"),
            },
            _ => {
                let mut parts = line.split_whitespace();
                let origin = session.set_origin(parts.next().unwrap_or_default());
                let date = session.set_departure_date(parts.next().unwrap_or_default());
                if let Some(msg) = &date.error_message {
                    eprintln!("⚠️  {} ({})", msg, date.formatted_text);
                }
                match session.submit().await {
                    Ok(resp) => {
                        println!("Flights from {origin}");
                        render_response(&resp);
                    }
                    Err(e) => eprintln!("❌ {e}"),
                }
            }
        }
        eprint!("> ");
    }

    Ok(())
}

/// Walk through the intro steps. Returns `false` if stdin closed first.
async fn run_onboarding(
    store: &OnboardingStore,
    progress: &mut OnboardingProgress,
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<bool> {
    loop {
        let step = progress.current_step as usize;
        let text = ONBOARDING_STEPS.get(step).copied().unwrap_or_default();
        eprintln!("\n[{}/{}] {}", step + 1, progress.total_steps, text);
        eprint!("(press Enter) ");

        if lines.next_line().await?.is_none() {
            return Ok(false);
        }

        if progress.is_last_step() {
            progress.complete();
            store.save(progress).await?;
            return Ok(true);
        }
        progress.next_step();
        store.save(progress).await?;
    }
}

fn render_response(resp: &SearchResponse) {
    render_offers(&resp.cheapest_first(), resp.currency(), Some(resp));
}

fn render_offers(offers: &[&FlightOffer], currency: &str, resp: Option<&SearchResponse>) {
    if offers.is_empty() {
        println!("  No destinations found for your search criteria\n");
        return;
    }
    for offer in offers {
        let name = resp
            .and_then(|r| r.location_name(&offer.destination))
            .map(|n| format!("  ({n})"))
            .unwrap_or_default();
        println!(
            "  {}  {}{}",
            offer.route_label(),
            offer.price_label(currency),
            name
        );
        match &offer.return_date {
            Some(ret) => println!("      Departure: {}  Return: {}", offer.departure_date, ret),
            None => println!("      Departure: {}", offer.departure_date),
        }
    }
    println!();
}

fn onboarding_path() -> PathBuf {
    std::env::var("FLIGHT_SEARCH_ONBOARDING_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".flight-destinations/onboarding.json")
        })
}
