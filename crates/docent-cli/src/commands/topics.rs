//! Topics command

use docent_core::{ExhibitKind, Topic};

pub fn run(exhibit: ExhibitKind) {
    let profile = exhibit.profile();

    println!("Exhibit: {}", exhibit);
    println!("=========={}", "=".repeat(exhibit.to_string().len()));
    println!();

    println!("Subscribes:");
    for topic in Topic::command_topics(exhibit) {
        let scope = match topic {
            Topic::Broadcast(_) => "broadcast",
            _ => "targeted",
        };
        println!("  {:<36} ({})", topic.to_string(), scope);
    }

    println!();
    println!("Publishes:");
    println!("  {:<36} (retained)", Topic::State(exhibit).to_string());

    println!();
    println!("Moments:         {}", profile.moments.join(", "));
    println!("Tour start:      {}", profile.tour_start);
    println!("State field:     {}", profile.state_beat_field);
    println!("goto-beat field: {}", profile.goto_beat_field);
    println!(
        "Tour content:    {}",
        if profile.tour_scoped_content {
            "per tour"
        } else {
            "shared"
        }
    );
}
