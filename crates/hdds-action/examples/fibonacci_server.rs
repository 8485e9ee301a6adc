// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fibonacci action server demo.
//!
//! Runs the server on an executor thread, sends two goals through the
//! in-process transport, cancels the second one and prints both results.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p hdds-action --example fibonacci_server
//! ```

#![allow(clippy::uninlined_format_args)]

use hdds_action::action::{
    ActionServer, ActionType, CancelRequest, CancelResponse, GoalHandle, GoalId, GoalResponse,
    IntraProcessTransport,
};
use hdds_action::{ActionServerOptions, Executor, Result};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Fibonacci;

impl ActionType for Fibonacci {
    type Goal = u32;
    type Result = Vec<u64>;
    type Feedback = Vec<u64>;

    fn type_name() -> &'static str {
        "example_interfaces/action/Fibonacci"
    }
}

fn run_goal(goal: &GoalHandle<Fibonacci>) -> Result<()> {
    goal.execute()?;

    let mut sequence = vec![0u64, 1];
    for _ in 1..*goal.goal() {
        if goal.is_canceling() {
            println!("goal {} canceled at {} terms", goal.goal_id(), sequence.len());
            return goal.canceled(sequence);
        }
        let next = sequence[sequence.len() - 1] + sequence[sequence.len() - 2];
        sequence.push(next);
        goal.publish_feedback(sequence.clone())?;
        thread::sleep(Duration::from_millis(20));
    }
    goal.succeed(sequence)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let transport = Arc::new(IntraProcessTransport::<Fibonacci>::new());
    let server = ActionServer::<Fibonacci>::builder("fibonacci")
        .on_goal(|goal_id, order| {
            if *order > 46 {
                println!("rejecting goal {}: order {} overflows", goal_id, order);
                GoalResponse::Reject
            } else {
                GoalResponse::Accept
            }
        })
        .on_cancel(|_| CancelResponse::Accept)
        .on_accepted(|goal| {
            thread::spawn(move || {
                if let Err(e) = run_goal(&goal) {
                    eprintln!("goal {} failed: {}", goal.goal_id(), e);
                }
            });
        })
        .options(ActionServerOptions::from_env())
        .build(transport.clone())?;

    let executor = Arc::new(Executor::new());
    executor.add_waitable(Arc::new(server.clone()));
    let spinner = {
        let executor = executor.clone();
        thread::spawn(move || executor.spin())
    };

    let short = GoalId::from_u128(1);
    let long = GoalId::from_u128(2);
    transport.send_goal(short, 10)?;
    transport.send_goal(long, 40)?;
    transport.send_goal(GoalId::from_u128(3), 90)?;

    thread::sleep(Duration::from_millis(100));
    transport.send_cancel(CancelRequest::goal(long))?;

    let short_result = transport.request_result(short)?;
    let long_result = transport.request_result(long)?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline
        && (transport.result_reply(short_result).is_none()
            || transport.result_reply(long_result).is_none())
    {
        thread::sleep(Duration::from_millis(10));
    }

    for (name, request) in [("short", short_result), ("long", long_result)] {
        match transport.result_reply(request) {
            Some(reply) => println!("{}: {:?} {:?}", name, reply.status, reply.result),
            None => println!("{}: no result", name),
        }
    }
    println!(
        "feedback messages for long goal: {}",
        transport.feedback_for(long).len()
    );

    executor.shutdown();
    if spinner.join().is_err() {
        eprintln!("executor thread panicked");
    }
    Ok(())
}
