//! Starter templates installed by `m365-admin templates seed`.

use super::{NewTemplate, TemplateService};
use crate::error::{AdminError, Result};

const WIRING_INSTRUCTIONS: &str = r#"<h2>Wiring Instructions</h2>
<p>Dear {{ customer_name }},</p>
<p>Thank you for your {{ metal_type }} purchase. Below are the wiring instructions for your order:</p>
<div style="background-color: #f5f5f5; padding: 15px; margin: 20px 0;">
<strong>Bank Information:</strong><br>
Bank Name: {{ bank_name }}<br>
Account Number: {{ account_number }}<br>
Routing Number: {{ routing_number }}<br>
Wire Amount: ${{ amount }}
</div>
<p><strong>Important:</strong> include your order number <strong>{{ order_number }}</strong> in the wire memo field.</p>
<p>Best regards,<br>The Sales Team</p>"#;

const ORDER_CONFIRMATION: &str = r#"<h2>Order Confirmation</h2>
<p>Dear {{ customer_name }},</p>
<p>Thank you for your order! We have received your purchase and are processing it now.</p>
<div style="background-color: #f5f5f5; padding: 15px; margin: 20px 0;">
<strong>Order Details:</strong><br>
Order Number: {{ order_number }}<br>
Date: {{ order_date }}<br>
Product: {{ product_description }}<br>
Quantity: {{ quantity }}<br>
Total: ${{ total_amount }}
</div>
<p>Your order will ship within {{ shipping_days }} business days.</p>
<p>Best regards,<br>The Sales Team</p>"#;

const PRICE_ALERT: &str = r#"<h2>Price Alert Notification</h2>
<p>Dear {{ customer_name }},</p>
<p>{{ metal_type }} has reached your target price level.</p>
<div style="background-color: #fff3cd; padding: 15px; margin: 20px 0;">
<strong>Current Market Prices:</strong><br>
{{ metal_type }}: ${{ current_price }} per {{ unit }}<br>
Change: {{ price_change }}%<br>
Last Updated: {{ timestamp }}
</div>
<p>Contact us at {{ contact_phone }} or reply to this email.</p>
<p>Best regards,<br>The Sales Team</p>"#;

const IRA_INFORMATION: &str = r#"<h2>Precious Metals IRA Information</h2>
<p>Dear {{ customer_name }},</p>
<p>Thank you for your interest in a self-directed precious metals IRA.</p>
<h3>Key Benefits:</h3>
<ul>
<li>Tax-advantaged retirement savings</li>
<li>Portfolio diversification</li>
<li>Physical ownership of metals in secure storage</li>
</ul>
<h3>Next Steps:</h3>
<ol>
<li>Schedule a consultation with our IRA specialists</li>
<li>Complete the account setup process</li>
<li>Fund your account and select your metals</li>
</ol>
<p>To schedule a consultation, reply to this email or call us at {{ contact_phone }}.</p>
<p>Best regards,<br>The IRA Team</p>"#;

const TEAM_NOTIFICATION: &str = r#"<h2>{{ notification_type }}</h2>
<p>Team,</p>
<p>{{ message_body }}</p>
<div style="background-color: #e8f4f8; padding: 15px; margin: 20px 0;">
<strong>Details:</strong><br>
{{ details }}
</div>
{% if action_required %}<p><strong>Action Required:</strong> {{ action_required }}</p>{% endif %}
<p>Thanks,<br>{{ sender_name }}</p>"#;

fn sample(
    name: &str,
    subject: &str,
    body_html: &str,
    category: &str,
    variables: &[&str],
    description: &str,
) -> NewTemplate {
    NewTemplate {
        template_name: name.to_string(),
        subject: subject.to_string(),
        body_html: body_html.to_string(),
        body_text: None,
        category: category.to_string(),
        variables: variables.iter().map(|v| v.to_string()).collect(),
        description: Some(description.to_string()),
    }
}

pub fn sample_templates() -> Vec<NewTemplate> {
    vec![
        sample(
            "wiring_instructions",
            "Wiring Instructions for Your {{ metal_type }} Purchase",
            WIRING_INSTRUCTIONS,
            "wiring",
            &[
                "customer_name",
                "metal_type",
                "bank_name",
                "account_number",
                "routing_number",
                "amount",
                "order_number",
            ],
            "Wiring instructions for precious metals purchases",
        ),
        sample(
            "order_confirmation",
            "Order Confirmation - {{ order_number }}",
            ORDER_CONFIRMATION,
            "customer_service",
            &[
                "customer_name",
                "order_number",
                "order_date",
                "product_description",
                "quantity",
                "total_amount",
                "shipping_days",
            ],
            "Order confirmation for customer purchases",
        ),
        sample(
            "price_alert",
            "Price Alert: {{ metal_type }} Reaches {{ price_level }}",
            PRICE_ALERT,
            "customer_service",
            &[
                "customer_name",
                "metal_type",
                "price_level",
                "current_price",
                "unit",
                "price_change",
                "timestamp",
                "contact_phone",
            ],
            "Price alert notification for customers monitoring metals prices",
        ),
        sample(
            "ira_information",
            "Information About Precious Metals IRA",
            IRA_INFORMATION,
            "customer_service",
            &["customer_name", "contact_phone"],
            "Educational information about precious metals IRAs",
        ),
        sample(
            "team_notification",
            "New {{ notification_type }}: {{ subject_line }}",
            TEAM_NOTIFICATION,
            "internal",
            &[
                "notification_type",
                "subject_line",
                "message_body",
                "details",
                "action_required",
                "sender_name",
            ],
            "Internal team notifications and updates",
        ),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

/// Install every sample template whose name is not taken yet.
pub fn seed(service: &TemplateService) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    for template in sample_templates() {
        let name = template.template_name.clone();
        match service.create_template(template) {
            Ok(_) => report.created.push(name),
            Err(AdminError::TemplateExists(_)) => {
                tracing::info!(template = %name, "sample template already present");
                report.skipped.push(name);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}
