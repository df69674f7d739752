//! # Producer/consumer pipeline
//!
//! Demonstrates the cancellation-aware primitives:
//! - [`Channel`] with bounded capacity, `mark_done` and `join`
//! - [`Lock`] guarding a shared tally
//! - [`sequence::counter`] as a paced producer
//! - Stopping idle consumers with [`Supervisor::shutdown`]
//!
//! ## Flow
//! ```text
//! producer-1 ─┐                       ┌─► consumer-1 ─┐
//!             ├─► Channel(cap 4) ─────┤               ├─► Lock<Tally>
//! producer-2 ─┘                       └─► consumer-2 ─┘
//!
//! main: join producers ─► channel.join() ─► shutdown() ─► consumers end Cancelled
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example pipeline
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use taskward::{
    CancelToken, Channel, Config, Lock, SpawnOptions, Supervisor, TaskContext, UnitFn, UnitRef,
    sequence,
};

#[derive(Debug, Default)]
struct Tally {
    items: u64,
    sum: u64,
}

fn producer(id: u64, queue: Arc<Channel<u64>>) -> UnitRef<u64> {
    UnitFn::arc(format!("producer-{id}"), move |ctx: TaskContext| {
        let queue = Arc::clone(&queue);
        async move {
            let mut numbers = Box::pin(sequence::counter(5, Duration::from_millis(20)));
            let mut sent: u64 = 0;
            while let Some(n) = numbers.next().await {
                queue.put(id * 100 + n, ctx.token()).await?;
                println!("[producer-{id}] put {}", id * 100 + n);
                sent += 1;
            }
            Ok(sent)
        }
    })
}

fn consumer(id: u64, queue: Arc<Channel<u64>>, tally: Arc<Lock<Tally>>) -> UnitRef<()> {
    UnitFn::arc(format!("consumer-{id}"), move |ctx: TaskContext| {
        let queue = Arc::clone(&queue);
        let tally = Arc::clone(&tally);
        async move {
            // `get` fails only once shutdown requests the token.
            while let Ok(item) = queue.get(ctx.token()).await {
                ctx.sleep(Duration::from_millis(35)).await?;
                tally
                    .update(ctx.token(), |t| {
                        t.items += 1;
                        t.sum += item;
                    })
                    .await?;
                queue.mark_done()?;
                println!("[consumer-{id}] done {item}");
            }
            Ok(())
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let sup = Supervisor::new(Config::default());
    let queue = Arc::new(Channel::new(4));
    let tally = Arc::new(Lock::new(Tally::default()));

    let consumers: Vec<_> = (1..=2)
        .map(|id| {
            let unit = consumer(id, Arc::clone(&queue), Arc::clone(&tally));
            sup.spawn(unit, SpawnOptions::new())
        })
        .collect();
    let producers: Vec<_> = (1..=2)
        .map(|id| sup.spawn(producer(id, Arc::clone(&queue)), SpawnOptions::new()))
        .collect();

    for handle in producers {
        let name = handle.name().to_string();
        let out = handle.join().await;
        println!("[main] {name}: {}", out.as_label());
    }

    let token = CancelToken::new();
    queue.join(&token).await?;
    println!("[main] queue drained, unfinished={}", queue.unfinished());

    sup.shutdown();
    for handle in consumers {
        let name = handle.name().to_string();
        println!("[main] {name}: {}", handle.join().await.as_label());
    }

    let tally = tally.acquire(&token).await?;
    println!("[main] processed {} items, sum={}", tally.items, tally.sum);
    Ok(())
}
