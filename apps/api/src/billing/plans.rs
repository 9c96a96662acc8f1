use serde::Serialize;

/// A pricing tier shown on the pricing page.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub name: &'static str,
    pub price: &'static str,
    pub period: &'static str,
    pub features: &'static [&'static str],
    pub cta: &'static str,
    pub featured: bool,
    /// Stripe price for self-serve checkout. `None` for free and sales-led tiers.
    pub price_id: Option<String>,
}

pub const TRIAL_NOTE: &str = "All plans include 14-day free trial. No credit card required.";

pub fn catalog(pro_price_id: &str) -> Vec<Plan> {
    vec![
        Plan {
            name: "Free",
            price: "$0",
            period: "forever",
            features: &[
                "Basic authentication",
                "User dashboard",
                "Email support",
                "Community access",
            ],
            cta: "Get Started",
            featured: false,
            price_id: None,
        },
        Plan {
            name: "Pro",
            price: "$29",
            period: "per month",
            features: &[
                "Everything in Free",
                "Stripe payments",
                "Priority support",
                "Advanced analytics",
                "Custom branding",
                "API access",
            ],
            cta: "Subscribe Now",
            featured: true,
            price_id: Some(pro_price_id.to_string()),
        },
        Plan {
            name: "Enterprise",
            price: "Custom",
            period: "contact us",
            features: &[
                "Everything in Pro",
                "Dedicated support",
                "Custom integrations",
                "SLA guarantee",
                "Training & onboarding",
            ],
            cta: "Contact Sales",
            featured: false,
            price_id: None,
        },
    ]
}

/// Whether `price_id` belongs to a self-serve plan in the catalogue.
pub fn is_purchasable(plans: &[Plan], price_id: &str) -> bool {
    plans
        .iter()
        .any(|plan| plan.price_id.as_deref() == Some(price_id))
}
