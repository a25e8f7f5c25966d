use async_trait::async_trait;
use chrono::Utc;
use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{error, info};

use crate::discord::{BLURPLE, Embed, MessageSink, OutgoingMessage};
use crate::error::TrackerError;
use crate::scheduler::Job;

/// Name of the quote timer
pub const QUOTE_TIMER: &str = "inspirational_quotes";

const QUOTE_TITLE: &str = "💡 Daily Inspiration";

const QUOTES: &[&str] = &[
    "Don't crash into things. That's aviation rule number one. - George Washington",
    "The best way to land a plane is on the runway, not in a tree. Trust me on this. - Abraham Lincoln",
    "If you see a mountain, don't fly into it. Fly around it. Very important. - Theodore Roosevelt",
    "Always check your fuel before takeoff. Running out of gas mid-flight is considered bad form. - Franklin D. Roosevelt",
    "Birds can fly. Planes can fly. But if you mix them up, you're gonna have a bad time. - John F. Kennedy",
    "The ground is not your friend when you're supposed to be in the air. Stay up there. - Ronald Reagan",
    "Two wings are better than one. Three wings? That's just showing off. - George W. Bush",
    "If your plane is on fire, that's usually a sign something went wrong. - Barack Obama",
    "Always remember: up is good, down is bad, sideways is concerning. - Donald Trump",
    "The sky is the limit, but only if you remember to check your altitude. - Joe Biden",
    "Flying is 90% confidence and 10% not hitting things. - Dwight D. Eisenhower",
    "A good pilot knows when to land. A great pilot knows when NOT to land. - Harry S. Truman",
    "If you're upside down, you're probably doing it wrong. - Lyndon B. Johnson",
    "The runway is that long flat thing. Try to land on it, not next to it. - Richard Nixon",
    "Gravity is not a suggestion. It's a law. Plan accordingly. - Gerald Ford",
    "If your co-pilot is screaming, you might want to listen. - Jimmy Carter",
    "Flying backwards is impressive, but not recommended for commercial flights. - Bill Clinton",
    "The best landing is the one where everyone walks away. - George H.W. Bush",
    "If you see another plane coming at you, turn. Just turn. - Thomas Jefferson",
    "Altitude is your friend. The ground is not. Remember this. - James Madison",
    "A plane that's on fire is a plane that needs attention. Immediately. - Andrew Jackson",
    "The sky is big. Use all of it. Don't just use the part near the ground. - Ulysses S. Grant",
    "If your plane has more holes than it should, that's a problem. - Woodrow Wilson",
    "Flying is easy. Landing is the hard part. Try to do both. - Calvin Coolidge",
    "The best way to avoid a crash is to not crash. Revolutionary, I know. - Herbert Hoover",
    "If you're lost, ask for directions. Preferably before you run out of fuel. - John Adams",
    "A plane should have wings. This is not optional. - James Monroe",
    "The faster you go, the less time you have to make mistakes. Plan ahead. - William McKinley",
    "If you can't see where you're going, slow down. Or stop. Stopping is good too. - Warren G. Harding",
    "Flying is 10% skill and 90% not panicking when things go wrong. - William Howard Taft",
    "The best pilot is the one who lands safely. Everything else is just style points. - James K. Polk",
    "If your plane is making sounds it shouldn't make, that's your cue to land. - Martin Van Buren",
    "The sky is free. Use it wisely. Don't waste it by crashing. - John Quincy Adams",
    "A good landing is when you can use the plane again. A great landing is when you can use it immediately. - Andrew Johnson",
    "If you're not sure if you should fly, the answer is probably no. - Chester A. Arthur",
    "The ground will always be there. The sky won't wait for you. But still, don't rush. - Grover Cleveland",
    "Flying is like walking, but higher up and with more consequences. - Benjamin Harrison",
    "If you see a bird, don't try to race it. You'll lose. - William Henry Harrison",
    "The best way to learn to fly is to not crash on your first try. - Zachary Taylor",
    "Altitude is not a suggestion. It's a requirement. - Millard Fillmore",
];

/// A quote split into its text and attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote<'a> {
    pub text: &'a str,
    pub author: &'a str,
}

impl<'a> Quote<'a> {
    /// Split `"text - author"`; a quote without attribution is credited to "Unknown"
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(" - ") {
            Some((text, author)) => Self { text, author },
            None => Self {
                text: raw,
                author: "Unknown",
            },
        }
    }

    pub fn to_embed(&self) -> Embed {
        Embed::new(QUOTE_TITLE)
            .description(format!("\"{}\"", self.text))
            .color(BLURPLE)
            .footer(self.author)
            .timestamp(Utc::now())
    }
}

/// Sends inspirational quotes by DM
#[derive(Clone)]
pub struct QuoteService {
    sink: Arc<dyn MessageSink>,
}

impl QuoteService {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    pub fn all_quotes() -> &'static [&'static str] {
        QUOTES
    }

    pub fn random_quote() -> Quote<'static> {
        let raw = QUOTES.choose(&mut rand::rng()).copied().unwrap_or(QUOTES[0]);
        Quote::parse(raw)
    }

    pub async fn send_quote(&self, user_id: &str) -> Result<Quote<'static>, TrackerError> {
        let quote = Self::random_quote();
        let message = OutgoingMessage::embed(quote.to_embed());
        self.sink.send_direct_message(user_id, &message).await?;
        info!("Inspirational quote sent to user {}", user_id);
        Ok(quote)
    }
}

/// Sends one quote to each configured user per tick
pub struct QuoteJob {
    service: QuoteService,
    user_ids: Vec<String>,
}

impl QuoteJob {
    pub fn new(service: QuoteService, user_ids: Vec<String>) -> Self {
        Self { service, user_ids }
    }
}

#[async_trait]
impl Job for QuoteJob {
    fn name(&self) -> &str {
        QUOTE_TIMER
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let mut failed = 0usize;
        for user_id in &self.user_ids {
            if let Err(e) = self.service.send_quote(user_id).await {
                error!("Failed to send quote to user {}: {}", user_id, e);
                metrics::counter!("quotes.delivery_failures_total").increment(1);
                failed += 1;
            } else {
                metrics::counter!("quotes.sent_total").increment(1);
            }
        }

        if !self.user_ids.is_empty() && failed == self.user_ids.len() {
            anyhow::bail!("no quotes delivered ({} users)", failed);
        }
        Ok(())
    }
}
