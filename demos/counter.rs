/*

THIS SOFTWARE IS OPEN SOURCE UNDER THE MIT LICENSE

Copyright 2025 Vincent Maciejewski, & M2 Tech
Contact:
v@m2te.ch
mayeski@gmail.com
https://www.linkedin.com/in/vmayeski/
http://m2te.ch/

*/

//! Counter Example - Two actors relaying a running total
//!
//! Demonstrates:
//! - Actors that only know each other through interface recipients
//! - Using the `started` hook to capture the actor's own recipient
//! - Spawning an actor from inside a handler
//! - Using SystemHandle to signal termination
//!
//! Run with `cargo run --example counter -- 10000`.

use actor_lite::{Actor, ActorSystem, Context, DispatcherConfig, Recipient, SystemHandle};
use tracing_subscriber::EnvFilter;

/// Calls a counter understands.
trait CountRequestHandler {
    fn count(&mut self, collector: Recipient<dyn CountResponseHandler>, base: i64, value: i64);
}

/// Calls a collector understands.
trait CountResponseHandler {
    fn out_current_total(&mut self, counter: Recipient<dyn CountRequestHandler>, total: i64);
}

// Adds two numbers and sends the result back
#[derive(Default)]
struct Counter {
    me: Option<Recipient<dyn CountRequestHandler>>,
}

fn counter_as_handler(counter: &mut Counter) -> &mut (dyn CountRequestHandler + 'static) {
    counter
}

impl Actor for Counter {
    fn started(&mut self, ctx: &mut Context<Self>) {
        self.me = Some(ctx.port().recipient(counter_as_handler));
    }
}

impl CountRequestHandler for Counter {
    fn count(&mut self, collector: Recipient<dyn CountResponseHandler>, base: i64, value: i64) {
        let Some(me) = self.me.clone() else { return };
        collector.post(move |c| c.out_current_total(me, base + value));
    }
}

// Drives the counter until `max` values have been added
struct Calculator {
    current: i64,
    index: i64,
    max: i64,
    me: Option<Recipient<dyn CountResponseHandler>>,
    done: SystemHandle,
}

fn calculator_as_collector(calc: &mut Calculator) -> &mut (dyn CountResponseHandler + 'static) {
    calc
}

impl Calculator {
    fn new(done: SystemHandle) -> Self {
        Calculator {
            current: 0,
            index: 0,
            max: 0,
            me: None,
            done,
        }
    }

    fn start_calculate(&mut self, ctx: &mut Context<Self>, max: i64) {
        println!("Calculator: summing 1..={}", max);
        self.max = max;
        let counter = ctx.spawn(Counter::default()).recipient(counter_as_handler);
        self.request(&counter);
    }

    fn request(&self, counter: &Recipient<dyn CountRequestHandler>) {
        let Some(me) = self.me.clone() else { return };
        let (base, value) = (self.current, self.index);
        counter.post(move |c| c.count(me, base, value));
    }
}

impl Actor for Calculator {
    fn started(&mut self, ctx: &mut Context<Self>) {
        self.me = Some(ctx.port().recipient(calculator_as_collector));
    }
}

impl CountResponseHandler for Calculator {
    fn out_current_total(&mut self, counter: Recipient<dyn CountRequestHandler>, total: i64) {
        self.current = total;
        self.index += 1;
        if self.index <= self.max {
            self.request(&counter);
        } else {
            println!("CurrentTotal: {}", total);
            self.done.terminate();
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let max: i64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(10_000);

    println!("=== Counter Example ===");

    let mut system = ActorSystem::new(DispatcherConfig::default())?;
    let calculator = system.spawn_named("calculator", Calculator::new(system.handle()));
    calculator.post(move |c, ctx| c.start_calculate(ctx, max));

    // Wait for the calculator to call terminate()
    system.run();
    system.end();

    println!("Expected: {}", max * (max + 1) / 2);
    println!("Stats: {}", serde_json::to_string(&system.stats())?);
    println!("=== Example Complete ===");
    Ok(())
}
