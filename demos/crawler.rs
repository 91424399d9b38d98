/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Crawler Example - A monitor actor farming URLs out to crawler actors
//!
//! Demonstrates:
//! - Handlers that start async work (on tokio) and report back with a post
//! - Reusing and retiring worker actors with `ctx.exit()`
//! - Interface recipients for the statistics protocol
//! - A periodic Timer driving a reporter actor
//!
//! The "web" is simulated: pages link to each other in a fixed pattern and
//! fetches just sleep, so the example runs offline.
//!
//! Run with `cargo run --example crawler [-- config.json]`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use actor_lite::{
    Actor, ActorSystem, Context, DispatcherConfig, Port, Recipient, SystemHandle, Timer,
};
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

const MAX_CRAWLERS: usize = 8;
const SITE_SIZE: u64 = 300;
const SITE_PREFIX: &str = "http://example.test/page/";

fn page_url(id: u64) -> String {
    format!("{}{}", SITE_PREFIX, id)
}

fn page_id(url: &str) -> Option<u64> {
    url.strip_prefix(SITE_PREFIX)?.parse().ok()
}

struct Page {
    content: String,
    links: Vec<String>,
}

/// Pretend to download a page.
async fn fetch(url: String) -> Result<Page, String> {
    let id = page_id(&url).ok_or_else(|| format!("unknown host in {}", url))?;
    tokio::time::sleep(Duration::from_millis(5 + id % 20)).await;

    if id % 37 == 36 {
        return Err("HTTP 500".to_string());
    }

    let mut links: Vec<String> = (1..=3).map(|k| page_url((id * 7 + k * 13) % SITE_SIZE)).collect();
    if id % 50 == 0 {
        links.push("http://elsewhere.test/".to_string());
    }

    Ok(Page {
        content: format!("<html><title>page {}</title></html>", id),
        links,
    })
}

// Fetches one URL at a time and reports to the monitor
struct Crawler {
    runtime: Handle,
}

impl Actor for Crawler {}

impl Crawler {
    fn crawl(&mut self, ctx: &mut Context<Self>, collector: Port<Monitor>, url: String) {
        let me = ctx.port();
        self.runtime.spawn(async move {
            match fetch(url.clone()).await {
                Ok(page) => collector.post(move |m, ctx| m.succeeded(ctx, me, url, page)),
                Err(error) => collector.post(move |m, ctx| m.failed(ctx, me, url, error)),
            }
        });
    }
}

trait StatisticRequestHandler {
    fn get_crawled_count(&mut self, requester: Recipient<dyn StatisticResponseHandler>);
    fn get_content(&mut self, requester: Recipient<dyn StatisticResponseHandler>, url: String);
}

trait StatisticResponseHandler {
    fn reply_crawled_count(&mut self, count: usize);
    fn reply_content(&mut self, url: String, content: Option<String>);
}

// Owns the frontier and the results; keeps at most MAX_CRAWLERS busy
struct Monitor {
    all_urls: HashSet<String>,
    ready_to_crawl: VecDeque<String>,
    url_content: HashMap<String, String>,
    failures: usize,
    max_crawlers: usize,
    working_crawlers: usize,
    runtime: Handle,
    done: SystemHandle,
}

fn monitor_as_statistics(monitor: &mut Monitor) -> &mut (dyn StatisticRequestHandler + 'static) {
    monitor
}

impl Actor for Monitor {}

impl Monitor {
    fn new(max_crawlers: usize, runtime: Handle, done: SystemHandle) -> Self {
        Monitor {
            all_urls: HashSet::new(),
            ready_to_crawl: VecDeque::new(),
            url_content: HashMap::new(),
            failures: 0,
            max_crawlers,
            working_crawlers: 0,
            runtime,
            done,
        }
    }

    fn crawl(&mut self, ctx: &mut Context<Self>, url: String) {
        if !self.all_urls.insert(url.clone()) {
            return;
        }

        if self.working_crawlers < self.max_crawlers {
            self.working_crawlers += 1;
            let crawler = self.new_crawler(ctx);
            Self::assign(ctx, &crawler, url);
        } else {
            self.ready_to_crawl.push_back(url);
        }
    }

    fn succeeded(&mut self, ctx: &mut Context<Self>, crawler: Port<Crawler>, url: String, page: Page) {
        tracing::info!(%url, links = page.links.len(), "crawled");
        self.url_content.insert(url, page.content);

        for link in page.links {
            if self.all_urls.insert(link.clone()) {
                self.ready_to_crawl.push_back(link);
            }
        }

        self.dispatch_crawling_tasks(ctx, crawler);
    }

    fn failed(&mut self, ctx: &mut Context<Self>, crawler: Port<Crawler>, url: String, error: String) {
        tracing::warn!(%url, %error, "crawl failed");
        self.failures += 1;
        self.dispatch_crawling_tasks(ctx, crawler);
    }

    fn dispatch_crawling_tasks(&mut self, ctx: &mut Context<Self>, reusable: Port<Crawler>) {
        match self.ready_to_crawl.pop_front() {
            Some(url) => Self::assign(ctx, &reusable, url),
            None => {
                self.working_crawlers -= 1;
                reusable.post(|_, ctx| ctx.exit());
            }
        }

        while self.working_crawlers < self.max_crawlers {
            let Some(url) = self.ready_to_crawl.pop_front() else { break };
            let crawler = self.new_crawler(ctx);
            Self::assign(ctx, &crawler, url);
            self.working_crawlers += 1;
        }

        if self.working_crawlers == 0 {
            tracing::info!(
                crawled = self.url_content.len(),
                failed = self.failures,
                seen = self.all_urls.len(),
                "crawl complete"
            );
            self.done.terminate();
        }
    }

    fn new_crawler(&self, ctx: &Context<Self>) -> Port<Crawler> {
        ctx.spawn(Crawler {
            runtime: self.runtime.clone(),
        })
    }

    fn assign(ctx: &Context<Self>, crawler: &Port<Crawler>, url: String) {
        let collector = ctx.port();
        crawler.post(move |c, ctx| c.crawl(ctx, collector, url));
    }
}

impl StatisticRequestHandler for Monitor {
    fn get_crawled_count(&mut self, requester: Recipient<dyn StatisticResponseHandler>) {
        let count = self.url_content.len();
        requester.post(move |r| r.reply_crawled_count(count));
    }

    fn get_content(&mut self, requester: Recipient<dyn StatisticResponseHandler>, url: String) {
        let content = self.url_content.get(&url).cloned();
        requester.post(move |r| r.reply_content(url, content));
    }
}

// Polls the monitor on a timer and prints what it hears back
struct StatisticReporter {
    monitor: Recipient<dyn StatisticRequestHandler>,
    me: Option<Recipient<dyn StatisticResponseHandler>>,
    watched_url: String,
    timer: Option<Timer>,
}

fn reporter_as_responder(
    reporter: &mut StatisticReporter,
) -> &mut (dyn StatisticResponseHandler + 'static) {
    reporter
}

impl StatisticReporter {
    fn new(monitor: Recipient<dyn StatisticRequestHandler>, watched_url: String) -> Self {
        StatisticReporter {
            monitor,
            me: None,
            watched_url,
            timer: None,
        }
    }

    fn report(&mut self) {
        let Some(me) = self.me.clone() else { return };
        let me2 = me.clone();
        let url = self.watched_url.clone();
        self.monitor.post(move |m| m.get_crawled_count(me));
        self.monitor.post(move |m| m.get_content(me2, url));
    }
}

impl Actor for StatisticReporter {
    fn started(&mut self, ctx: &mut Context<Self>) {
        self.me = Some(ctx.port().recipient(reporter_as_responder));
        self.timer = Some(Timer::periodic(ctx.port(), Duration::from_millis(250), || {
            |r: &mut StatisticReporter, _ctx: &mut Context<StatisticReporter>| r.report()
        }));
    }

    fn stopped(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl StatisticResponseHandler for StatisticReporter {
    fn reply_crawled_count(&mut self, count: usize) {
        println!("Crawled: {}", count);
    }

    fn reply_content(&mut self, url: String, content: Option<String>) {
        println!("URL: {}", url);
        println!("content: {}", content.as_deref().unwrap_or("<not crawled yet>"));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => DispatcherConfig::from_file(path)?,
        None => DispatcherConfig::default(),
    };

    println!("=== Crawler Example ===");

    // Fetches run here; actor handlers run on the system's pool.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()?;

    let mut system = ActorSystem::new(config)?;
    let start = page_url(0);

    let monitor = system.spawn_named(
        "monitor",
        Monitor::new(MAX_CRAWLERS, runtime.handle().clone(), system.handle()),
    );
    let reporter = system.spawn_named(
        "reporter",
        StatisticReporter::new(monitor.recipient(monitor_as_statistics), start.clone()),
    );

    monitor.post(move |m, ctx| m.crawl(ctx, start));
    reporter.post(|r, _| r.report());

    if !system.run_for(Duration::from_secs(60)) {
        tracing::warn!("crawl did not finish within 60s");
    }

    reporter.post(|_, ctx| ctx.exit());
    system.end();
    runtime.shutdown_timeout(Duration::from_secs(1));

    println!("Stats: {}", serde_json::to_string_pretty(&system.stats())?);
    println!("=== Example Complete ===");
    Ok(())
}
