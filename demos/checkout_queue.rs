//! Checkout Queue Example
//!
//! A single cashier serving customers who arrive at fixed intervals.
//! Arrivals schedule their own service completion through a scheduler
//! handle, and a shift change deactivates arrivals that were booked
//! after closing time.
//!
//! Run with: cargo run --example checkout_queue

use std::cell::RefCell;
use std::rc::Rc;

use eventide::prelude::*;

const SERVICE_TIME: f64 = 1.5;
const CLOSING_TIME: f64 = 12.0;

#[derive(Debug, Default)]
struct Cashier {
    busy_until: f64,
    total_wait: f64,
}

fn main() -> SimResult<()> {
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║              Checkout Queue: Discrete-Event Demo              ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    let cashier = Rc::new(RefCell::new(Cashier::default()));
    let mut scheduler = EventScheduler::<f64, ()>::new();

    book_arrivals(&mut scheduler, &cashier)?;
    close_the_store(&mut scheduler);
    run_in_shifts(&mut scheduler);
    report(&scheduler, &cashier.borrow());

    println!("\n✓ Checkout queue demonstration completed!");
    Ok(())
}

fn book_arrivals(
    scheduler: &mut EventScheduler<f64, ()>,
    cashier: &Rc<RefCell<Cashier>>,
) -> SimResult<()> {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Booking Arrivals");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    for customer in 0..10_u32 {
        let arrival = f64::from(customer) * 1.4;
        let handle = scheduler.handle();
        let cashier = Rc::clone(cashier);

        let event = Event::new(arrival)?
            .with_entry("kind", "arrival")
            .with_entry("customer", customer)
            .with_action(move || {
                let Ok(now) = handle.now() else { return };
                let mut c = cashier.borrow_mut();
                let start = c.busy_until.max(now);
                c.total_wait += start - now;
                c.busy_until = start + SERVICE_TIME;

                let mut context = Context::new();
                context.insert("kind".into(), "departure".into());
                context.insert("customer".into(), customer.into());
                let _ = handle.timeout_with(c.busy_until - now, None, Some(context));
            });
        let id = scheduler.schedule(event)?;
        println!("  customer {customer:>2} arrives at {arrival:>5.1}  ({id})");
    }

    println!("\n  Pending events: {}", scheduler.len());
    Ok(())
}

fn close_the_store(scheduler: &mut EventScheduler<f64, ()>) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Closing Time at {CLOSING_TIME:.1}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    scheduler.deactivate_all_events_by_condition(|_, e| e.time() >= CLOSING_TIME);
    let turned_away = scheduler.pending().filter(|e| !e.is_active()).count();
    println!("  Arrivals turned away: {turned_away}");
}

fn run_in_shifts(scheduler: &mut EventScheduler<f64, ()>) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Running in Four-Unit Shifts");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    let departures = |e: &ScheduledEvent<f64, ()>| e.get("kind").and_then(|v| v.as_str()) == Some("departure");

    for ceiling in [4.0, 8.0, 12.0, 16.0, 20.0] {
        let logged_before = scheduler.event_log().len();
        let log = scheduler.run_until_max_time(ceiling, Logging::filter(departures));
        println!(
            "  t = {:>5.1}: {} departures this shift, {} pending",
            ceiling,
            log.len() - logged_before,
            scheduler.len()
        );
    }
}

fn report(scheduler: &EventScheduler<f64, ()>, cashier: &Cashier) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    let served = scheduler.event_log().len();
    let mean_wait = if served == 0 {
        0.0
    } else {
        cashier.total_wait / served as f64
    };

    println!("  Events processed: {}", scheduler.steps());
    println!("  Fizzled arrivals: {}", scheduler.fizzles());
    println!("  Customers served: {served}");
    println!("  Mean wait:        {mean_wait:.2}");
    println!("  Final clock:      {:.1}", scheduler.current_time());
}
