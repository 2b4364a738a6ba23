// Copyright 2016 Pierre-Étienne Meunier
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Drives the robot to the origin: infers heading from position deltas,
//! plans moves/turns, and side-steps a detected obstacle.

use crate::error::ProtocolError;
use crate::framer::Expectation;
use std::collections::VecDeque;

/// Compass heading, cyclic modulo 4. `+1 mod 4` is a counter-clockwise
/// (left) rotation, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    PosX = 0,
    PosY = 1,
    NegX = 2,
    NegY = 3,
}

impl Direction {
    fn rotated(self, delta: i8) -> Direction {
        match mod4(self as i8 + delta) {
            0 => Direction::PosX,
            1 => Direction::PosY,
            2 => Direction::NegX,
            _ => Direction::NegY,
        }
    }
}

fn mod4(n: i8) -> i8 {
    n.rem_euclid(4)
}

/// A single outgoing command, independent of its wire text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Move,
    TurnLeft,
    TurnRight,
    GetMessage,
}

impl Directive {
    pub fn wire_message(self) -> &'static str {
        use crate::protocol;
        match self {
            Directive::Move => protocol::MOVE,
            Directive::TurnLeft => protocol::TURN_LEFT,
            Directive::TurnRight => protocol::TURN_RIGHT,
            Directive::GetMessage => protocol::GET_MESSAGE,
        }
    }
}

/// What processing an `OK` frame produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    /// One or more directives to write, in order.
    Directives(Vec<Directive>),
    /// The client sent something while picking up; the session logs it
    /// out and ends successfully.
    LoggedOut,
}

/// Per-session navigation state, per spec §3/§4.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    x: Option<i32>,
    y: Option<i32>,
    heading: Option<Direction>,
    last_action_was_move: bool,
    first_move_pending: bool,
    picking_up: bool,
    unstuck_counter: u8,
    side_step_queue: VecDeque<Directive>,
}

impl Navigator {
    pub fn new() -> Self {
        Navigator {
            x: None,
            y: None,
            heading: None,
            last_action_was_move: false,
            first_move_pending: true,
            picking_up: false,
            unstuck_counter: 0,
            side_step_queue: VecDeque::new(),
        }
    }

    pub fn expectation(&self) -> Expectation {
        if self.picking_up {
            Expectation::PickingUp
        } else {
            Expectation::Navigating
        }
    }

    /// Consumes one frame payload: the secret message while picking up,
    /// otherwise an `OK <x> <y>` position report.
    pub fn on_frame(&mut self, payload: &[u8]) -> Result<NavEvent, ProtocolError> {
        if self.picking_up {
            return Ok(NavEvent::LoggedOut);
        }
        let (x, y) = parse_ok(payload).ok_or(ProtocolError::Syntax)?;
        Ok(NavEvent::Directives(self.on_position_report(x, y)))
    }

    fn on_position_report(&mut self, new_x: i32, new_y: i32) -> Vec<Directive> {
        if self.first_move_pending {
            self.first_move_pending = false;
            self.x = Some(new_x);
            self.y = Some(new_y);
            if new_x == 0 && new_y == 0 {
                self.picking_up = true;
                return vec![Directive::GetMessage];
            }
            return vec![self.emit(Directive::Move)];
        }

        let old_x = self.x.expect("x set once first_move_pending clears");
        let old_y = self.y.expect("y set once first_move_pending clears");

        // Detect-stuck uses the *previous* heading/position; only if the
        // robot is not stuck do we update the heading from this delta.
        // See DESIGN.md, Open Question 1.
        if self.unstuck_counter == 0
            && self.last_action_was_move
            && new_x == old_x
            && new_y == old_y
        {
            return self.begin_side_step(new_x, new_y);
        }

        if new_x != old_x || new_y != old_y {
            self.heading = Some(infer_heading(old_x, old_y, new_x, new_y));
        }
        self.x = Some(new_x);
        self.y = Some(new_y);

        if self.unstuck_counter > 0 {
            self.unstuck_counter -= 1;
            if let Some(queued) = self.side_step_queue.pop_front() {
                return vec![queued];
            }
        }

        vec![self.plan()]
    }

    /// Marks `last_action_was_move` and returns the directive, for
    /// bookkeeping shared by the planner and the side-step sequence.
    fn emit(&mut self, directive: Directive) -> Directive {
        self.last_action_was_move = matches!(directive, Directive::Move);
        directive
    }

    fn turn(&mut self, left: bool) -> Directive {
        let heading = self
            .heading
            .expect("heading known by the time a turn is planned");
        self.heading = Some(heading.rotated(if left { 1 } else { -1 }));
        self.emit(if left {
            Directive::TurnLeft
        } else {
            Directive::TurnRight
        })
    }

    fn move_forward(&mut self) -> Directive {
        self.emit(Directive::Move)
    }

    /// Reduce |x| first, then |y|; turn toward the needed axis or move
    /// if already facing it; emit `GET MESSAGE` once both are zero.
    fn plan(&mut self) -> Directive {
        let x = self.x.expect("position known");
        let y = self.y.expect("position known");

        let target = if x > 0 {
            Direction::NegX
        } else if x < 0 {
            Direction::PosX
        } else if y > 0 {
            Direction::NegY
        } else if y < 0 {
            Direction::PosY
        } else {
            self.picking_up = true;
            return Directive::GetMessage;
        };

        let heading = self
            .heading
            .expect("heading known after the seeded first move");
        if heading == target {
            self.move_forward()
        } else if mod4(target as i8 - heading as i8) == 3 {
            self.turn(false)
        } else {
            self.turn(true)
        }
    }

    /// Obstacle directly ahead: side-step with a fixed 4-command
    /// sequence, absorbing the next four OK frames as telemetry.
    fn begin_side_step(&mut self, x: i32, y: i32) -> Vec<Directive> {
        let left = !((x > 0 && y < 0) || (x < 0 && y > 0));
        let first = self.turn(left);
        let second = self.move_forward();
        let third = self.turn(!left);
        let fourth = self.move_forward();
        self.unstuck_counter = 4;
        self.side_step_queue = VecDeque::from(vec![second, third, fourth]);
        vec![first]
    }
}

fn infer_heading(old_x: i32, old_y: i32, new_x: i32, new_y: i32) -> Direction {
    if new_x > old_x {
        Direction::PosX
    } else if new_x < old_x {
        Direction::NegX
    } else if new_y > old_y {
        Direction::PosY
    } else {
        Direction::NegY
    }
}

/// Parses `OK <sx> <sy>`: exactly three space-separated tokens, the
/// first literally `OK`, the other two signed decimal integers.
fn parse_ok(payload: &[u8]) -> Option<(i32, i32)> {
    let s = std::str::from_utf8(payload).ok()?;
    let mut parts = s.split(' ');
    let tag = parts.next()?;
    let sx = parts.next()?;
    let sy = parts.next()?;
    if parts.next().is_some() || tag != "OK" {
        return None;
    }
    Some((parse_signed(sx)?, parse_signed(sy)?))
}

fn parse_signed(token: &str) -> Option<i32> {
    let bytes = token.as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value: i32 = std::str::from_utf8(digits).ok()?.parse().ok()?;
    Some(if negative { -value } else { value })
}
