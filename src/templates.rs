//! Built-in sample documents for the CLI (`--sample`) and tests.
//!
//! Styles are inline so the samples render without a base URL.

/// Names accepted by [`sample`].
pub const SAMPLE_NAMES: &[&str] = &["invoice", "report", "minimal"];

/// Look up a sample by name.
pub fn sample(name: &str) -> Option<&'static str> {
    match name {
        "invoice" => Some(invoice_template()),
        "report" => Some(report_template()),
        "minimal" => Some(minimal_template()),
        _ => None,
    }
}

/// Invoice with a line-item table and print-friendly page rules.
pub fn invoice_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Invoice</title>
<style>
  @page { margin: 12mm; }
  body { font-family: sans-serif; color: #1f2933; }
  h1 { color: #1a365d; margin-bottom: 4px; }
  table { width: 100%; border-collapse: collapse; margin-top: 16px; }
  th, td { padding: 6px 8px; border-bottom: 1px solid #d9e2ec; text-align: left; }
  td.amount, th.amount { text-align: right; }
  .total { text-align: right; font-weight: bold; font-size: 1.2em; margin-top: 12px; }
</style>
</head>
<body>
  <h1>Invoice #2024-001</h1>
  <p>Acme Corp &middot; 123 Business St &middot; New York, NY 10001</p>
  <p><strong>Bill to:</strong> Client Inc, 456 Client Ave, Los Angeles, CA 90001</p>
  <table>
    <tr><th>Item</th><th>Qty</th><th class="amount">Price</th><th class="amount">Total</th></tr>
    <tr><td>Web development</td><td>40</td><td class="amount">$150.00</td><td class="amount">$6,000.00</td></tr>
    <tr><td>Design services</td><td>20</td><td class="amount">$125.00</td><td class="amount">$2,500.00</td></tr>
    <tr><td>Hosting (annual)</td><td>1</td><td class="amount">$500.00</td><td class="amount">$500.00</td></tr>
  </table>
  <p class="total">Total: $9,000.00</p>
</body>
</html>
"##
}

/// Multi-section report long enough to span pages.
pub fn report_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Quarterly Report</title>
<style>
  body { font-family: serif; line-height: 1.5; }
  h2 { page-break-before: always; }
  h2:first-of-type { page-break-before: avoid; }
</style>
</head>
<body>
  <h1>Quarterly Report</h1>
  <p><em>Q4 2025, confidential</em></p>
  <h2>Summary</h2>
  <p>Revenue grew 23% year over year to $4.2M. Enterprise wins drove most of the growth.</p>
  <h2>Highlights</h2>
  <ul>
    <li>Customer acquisition cost down 15%</li>
    <li>Net promoter score up to 72</li>
    <li>Three new enterprise partnerships</li>
  </ul>
  <h2>Outlook</h2>
  <p>Hiring continues in support and infrastructure through the first half.</p>
</body>
</html>
"##
}

pub fn minimal_template() -> &'static str {
    "<p>Hello, PDF.</p>"
}
