use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_client::auth::guard::{Requirement, RouteDecision, RouteGuard};
use campus_client::config::Config;
use campus_client::directory::resolver::{RecipientResolver, ResolverState};
use campus_client::error::ClientError;
use campus_client::messaging::board::DiscussionBoard;
use campus_client::messaging::model::NewDiscussion;
use campus_client::messaging::service::MessagingService;
use campus_client::Portal;
use campus_common::Role;

const MESSAGES_PATH: &str = "/messages";
const LOGIN_ATTEMPTS: usize = 3;

const HELP: &str = "\
commands:
  role <student|teacher|admin|any>   filter recipients by role
  search <term>                      search recipients by name or email
  pick <n>                           toggle result n in the selection
  selected                           show selected recipients
  title <text>                       title for a group discussion
  send <message>                     start a discussion with the selection
  list                               list your discussions
  open <discussion-id>               show the messages of a discussion
  reply <discussion-id> <message>    post in a discussion
  logout                             sign out and exit
  quit                               exit";

/// Every plain line of input, prompts and commands alike, goes through this
/// one buffered reader.
type InputLines = Lines<BufReader<Stdin>>;

async fn prompt(lines: &mut InputLines, label: &str) -> io::Result<Option<String>> {
    print!("{}: ", label);
    io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

/// Email from the shared reader; the password straight from the terminal.
async fn read_credentials(lines: &mut InputLines) -> io::Result<Option<(String, String)>> {
    let Some(email) = prompt(lines, "Email").await? else {
        return Ok(None);
    };
    let secret = tokio::task::spawn_blocking(|| rpassword::read_password_from_tty(Some("Password: ")))
        .await
        .map_err(io::Error::other)??;
    Ok(Some((email, secret)))
}

async fn sign_in(portal: &Portal, guard: &RouteGuard, lines: &mut InputLines) -> bool {
    for _ in 0..LOGIN_ATTEMPTS {
        let (email, secret) = match read_credentials(lines).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return false,
            Err(err) => {
                eprintln!("Could not read credentials: {err}");
                return false;
            }
        };

        match portal.session.login(&email, &secret).await {
            Ok(principal) => {
                let home = guard.after_login(&principal, None);
                println!("Signed in as {} ({}). Home: {home}", principal.display_name, principal.role);
                return true;
            }
            Err(err) => println!("{}", err.user_message(&portal.config.support_contact)),
        }
    }
    false
}

/// Recipient picker state typed at the prompt.
#[derive(Default)]
struct Draft {
    role: Option<Role>,
    search: String,
    title: Option<String>,
}

struct Repl {
    portal: Portal,
    guard: RouteGuard,
    resolver: RecipientResolver,
    board: DiscussionBoard,
    messaging: Arc<dyn MessagingService>,
    draft: Draft,
    lines: InputLines,
}

enum Flow {
    Continue,
    Exit,
}

impl Repl {
    fn new(portal: Portal, guard: RouteGuard, lines: InputLines) -> Self {
        Self {
            resolver: portal.recipient_resolver(),
            board: portal.discussion_board(),
            messaging: portal.messaging(),
            portal,
            guard,
            draft: Draft::default(),
            lines,
        }
    }

    async fn handle(&mut self, line: &str) -> Flow {
        let line = line.trim();
        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" => println!("{HELP}"),
            "role" => {
                if arg == "any" {
                    self.draft.role = None;
                } else {
                    match arg.parse::<Role>() {
                        Ok(role) => self.draft.role = Some(role),
                        Err(err) => {
                            println!("{err}");
                            return Flow::Continue;
                        }
                    }
                }
                return self.lookup().await;
            }
            "search" => {
                self.draft.search = arg.to_string();
                return self.lookup().await;
            }
            "pick" => self.pick(arg),
            "selected" => print_selection(&self.resolver.snapshot()),
            "title" => {
                self.draft.title = (!arg.is_empty()).then(|| arg.to_string());
            }
            "send" => return self.send(arg).await,
            "list" => match self.board.refresh().await {
                Ok(()) => {
                    for discussion in self.board.snapshot().discussions {
                        let kind = if discussion.is_group { "group" } else { "direct" };
                        println!(
                            "{:>6}  {} [{kind}, {} messages]",
                            discussion.id, discussion.title, discussion.message_count
                        );
                    }
                }
                Err(err) => return self.fail(err).await,
            },
            "open" => match self.messaging.list_messages(arg).await {
                Ok(messages) => {
                    for message in messages {
                        let at = message
                            .created_at
                            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        println!("{at} {}: {}", message.author(), message.content);
                    }
                }
                Err(err) => return self.fail(err).await,
            },
            "reply" => {
                let (discussion_id, content) = arg.split_once(' ').unwrap_or((arg, ""));
                match self.messaging.send_message(discussion_id, content).await {
                    Ok(message) => println!("Posted message {}.", message.id),
                    Err(err) => return self.fail(err).await,
                }
            }
            "logout" => {
                self.sign_out().await;
                println!("Signed out.");
                return Flow::Exit;
            }
            "quit" | "exit" => return Flow::Exit,
            other => println!("Unknown command `{other}`. Type `help`."),
        }
        Flow::Continue
    }

    async fn lookup(&mut self) -> Flow {
        let filters = self
            .portal
            .recipient_filters(self.draft.role, self.draft.search.clone());
        self.resolver.set_filters(filters);
        let state = self.resolver.settled().await;

        if let Some(err) = state.error.clone() {
            return self.fail(err).await;
        }
        if state.resolved_users.is_empty() {
            println!("No matching users.");
        }
        for (index, user) in state.resolved_users.iter().enumerate() {
            let mark = if state.selection.contains(user.id()) { "*" } else { " " };
            println!("{mark}{:>3}. {}", index + 1, user.label());
        }
        Flow::Continue
    }

    fn pick(&self, arg: &str) {
        let state = self.resolver.snapshot();
        let user = arg
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| state.resolved_users.get(index));
        match user {
            Some(user) => {
                let view = self.resolver.toggle_selection(user.id());
                let labels: Vec<String> = view.recipients.iter().map(|r| r.label()).collect();
                println!("Selected: {}", labels.join(", "));
            }
            None => println!("No result numbered `{arg}`."),
        }
    }

    async fn send(&mut self, message: &str) -> Flow {
        let selected = self.resolver.snapshot().selected_ids().to_vec();
        let new = match NewDiscussion::new(selected, message, self.draft.title.as_deref()) {
            Ok(new) => new,
            Err(err) => {
                println!("{}", err.user_message(&self.portal.config.support_contact));
                return Flow::Continue;
            }
        };

        match self.board.start_discussion(&new).await {
            Ok(discussion) => {
                println!("Started discussion {} \"{}\".", discussion.id, discussion.title);
                self.resolver.clear();
                self.draft = Draft::default();
                Flow::Continue
            }
            Err(err) => self.fail(err).await,
        }
    }

    /// Report a failure; an expired session sends the user back through login.
    async fn fail(&mut self, err: ClientError) -> Flow {
        println!("{}", err.user_message(&self.portal.config.support_contact));
        if !err.requires_reauth() {
            return Flow::Continue;
        }

        self.sign_out().await;
        if let RouteDecision::Redirect { notice: Some(notice), .. } = self.guard.check(
            &self.portal.session.session(),
            &Requirement::Authenticated,
            MESSAGES_PATH,
        ) {
            println!("{notice}");
        }
        if sign_in(&self.portal, &self.guard, &mut self.lines).await {
            Flow::Continue
        } else {
            Flow::Exit
        }
    }

    async fn sign_out(&mut self) {
        self.portal.session.logout().await;
        self.resolver.invalidate();
        self.resolver.clear();
    }
}

fn print_selection(state: &ResolverState) {
    if state.selection.is_empty() {
        println!("Nobody selected.");
        return;
    }
    println!("{} selected:", state.selection.len());
    for recipient in state.recipients() {
        println!("  {} ({})", recipient.label(), recipient.id());
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing, env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(api_url = %config.api_url, credentials = %config.credentials_path.display(), "campus client configured");

    let portal = match Portal::new(config) {
        Ok(portal) => portal,
        Err(err) => {
            eprintln!("Failed to start: {err}");
            std::process::exit(1);
        }
    };
    let guard = RouteGuard::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let session = portal.session.restore().await;
    match guard.check(&session, &Requirement::Authenticated, MESSAGES_PATH) {
        RouteDecision::Render => {
            if let Some(principal) = session.principal() {
                println!("Welcome back, {}.", principal.display_name);
            }
        }
        decision => {
            if let RouteDecision::Redirect { notice: Some(notice), .. } = decision {
                println!("{notice}");
            }
            if !sign_in(&portal, &guard, &mut lines).await {
                std::process::exit(1);
            }
        }
    }

    println!("{HELP}");
    let mut repl = Repl::new(portal, guard, lines);

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = tokio::select! {
            line = repl.lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        match line {
            Ok(Some(line)) => {
                if let Flow::Exit = repl.handle(&line).await {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::error!(?err, "failed to read input");
                break;
            }
        }
    }
}
